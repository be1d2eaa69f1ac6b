//! Adaptive learning: outcome ledger, two-tier weight tables, and the
//! smoothed weight learner that feeds the voting engine.

pub mod error;
pub mod learner;
pub mod ledger;
pub mod weights;

pub use error::StoreError;
pub use learner::{AdaptiveLearner, StrategyPerformance, UpdateReport};
pub use ledger::OutcomeLedger;
pub use weights::{WeightSnapshot, WeightStore, WeightTables};
