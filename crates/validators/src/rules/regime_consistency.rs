//! Declared-ideal-regime consistency check.

use crate::validator::{Validator, Verdict};
use confluence_core::{Candidate, Frame, RegimeSnapshot, StrategyCategory, TrendRegime};
use std::collections::BTreeMap;

/// Soft-fails candidates whose strategy declared ideal regimes that do
/// not include the current one. Mean-reversion strategies are exempt
/// from trend alignment: fading a trend is their trade. Strategies
/// with no declaration pass.
#[derive(Debug, Default)]
pub struct RegimeConsistencyValidator {
    declarations: BTreeMap<String, Vec<TrendRegime>>,
}

impl RegimeConsistencyValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a strategy's declared ideal regimes. Called at wiring
    /// time from each specialist's descriptor.
    pub fn declare(&mut self, strategy_name: impl Into<String>, regimes: Vec<TrendRegime>) {
        self.declarations.insert(strategy_name.into(), regimes);
    }
}

impl Validator for RegimeConsistencyValidator {
    fn name(&self) -> &'static str {
        "regime_consistency"
    }

    fn audit(&self, candidate: &Candidate, _frame: &Frame, regime: &RegimeSnapshot) -> Verdict {
        if candidate.category == StrategyCategory::MeanReversion {
            return Verdict::Pass;
        }
        let Some(declared) = self.declarations.get(&candidate.strategy_name) else {
            return Verdict::Pass;
        };
        if declared.is_empty() || declared.contains(&regime.trend) {
            return Verdict::Pass;
        }
        Verdict::Fail(format!(
            "{} declares {:?}, current regime is {:?}",
            candidate.strategy_name, declared, regime.trend
        ))
    }
}
