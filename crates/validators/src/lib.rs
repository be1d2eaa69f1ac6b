//! Validator gauntlet: five audit rules and the report fold.

pub mod gauntlet;
pub mod rules;
pub mod validator;

pub use gauntlet::{ValidationReport, ValidatorGauntlet};
pub use rules::{
    EventCalendar, NewsValidator, RegimeConsistencyValidator, RiskValidator, TrendValidator,
    VolatilityValidator,
};
pub use validator::{Validator, Verdict};
