//! Regime classification: indicator kernels and the eight-way
//! classifier producing [`confluence_core::RegimeSnapshot`].

pub mod classifier;
pub mod kernels;

pub use classifier::{RegimeClassifier, RegimeError, MIN_CLASSIFY_BARS};
