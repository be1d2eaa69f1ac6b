//! Directional-bias opposition check.

use crate::validator::{Validator, Verdict};
use confluence_core::{Candidate, Frame, RegimeSnapshot, StrategyCategory};

/// Fails candidates trading against the regime's directional bias.
/// Escalates to a hard veto when a trend-following or breakout
/// candidate opposes a strong regime: those families have no business
/// counter-trending.
#[derive(Debug, Default)]
pub struct TrendValidator;

impl Validator for TrendValidator {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn audit(&self, candidate: &Candidate, _frame: &Frame, regime: &RegimeSnapshot) -> Verdict {
        if !candidate.direction.is_directional() {
            return Verdict::Pass;
        }
        if !regime.bias.opposes(candidate.direction) {
            return Verdict::Pass;
        }

        let trend_family = matches!(
            candidate.category,
            StrategyCategory::TrendFollowing | StrategyCategory::Breakout
        );
        let reason = format!(
            "{} {} opposes {:?} bias",
            candidate.strategy_name,
            candidate.direction,
            regime.bias
        );
        if trend_family && regime.strength.is_strong() {
            Verdict::Veto(format!("{reason} in a strong regime"))
        } else {
            Verdict::Fail(reason)
        }
    }
}
