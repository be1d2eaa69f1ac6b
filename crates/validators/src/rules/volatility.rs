//! Extreme-volatility scalping block.

use crate::validator::{Validator, Verdict};
use confluence_core::{Candidate, Frame, RegimeSnapshot, StrategyCategory, VolatilityLevel};

/// Hard-vetoes scalping candidates while volatility reads Extreme;
/// scalp stops do not survive those ranges.
#[derive(Debug, Default)]
pub struct VolatilityValidator;

impl Validator for VolatilityValidator {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn audit(&self, candidate: &Candidate, _frame: &Frame, regime: &RegimeSnapshot) -> Verdict {
        if candidate.category == StrategyCategory::Scalping
            && regime.volatility == VolatilityLevel::Extreme
        {
            return Verdict::Veto(format!(
                "{}: scalping blocked in extreme volatility",
                candidate.strategy_name
            ));
        }
        Verdict::Pass
    }
}
