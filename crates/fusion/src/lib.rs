//! Signal fusion: the weighted voting engine that turns a validated
//! candidate slate plus the regime snapshot into one final decision.

pub mod engine;

pub use engine::VotingEngine;
