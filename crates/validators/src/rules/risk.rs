//! Risk-reward sanity check.

use crate::validator::{Validator, Verdict};
use confluence_core::{Candidate, Frame, RegimeSnapshot};

/// Vetoes zero-risk setups and implausible risk-reward ratios, fails
/// ratios below the configured floor. Candidates without trade levels
/// pass: they vote but never execute.
#[derive(Debug)]
pub struct RiskValidator {
    min_risk_reward: f64,
    max_risk_reward: f64,
}

impl RiskValidator {
    #[must_use]
    pub fn new(min_risk_reward: f64, max_risk_reward: f64) -> Self {
        Self {
            min_risk_reward,
            max_risk_reward,
        }
    }
}

impl Validator for RiskValidator {
    fn name(&self) -> &'static str {
        "risk"
    }

    fn audit(&self, candidate: &Candidate, _frame: &Frame, _regime: &RegimeSnapshot) -> Verdict {
        if candidate.has_zero_risk() {
            return Verdict::Veto(format!(
                "{}: entry equals stop, zero risk",
                candidate.strategy_name
            ));
        }

        match candidate.risk_reward() {
            Some(rr) if rr > self.max_risk_reward => Verdict::Veto(format!(
                "{}: risk-reward {rr:.2} above {:.1}, implausible",
                candidate.strategy_name, self.max_risk_reward
            )),
            Some(rr) if rr < self.min_risk_reward => Verdict::Fail(format!(
                "{}: risk-reward {rr:.2} below {:.1}",
                candidate.strategy_name, self.min_risk_reward
            )),
            _ => Verdict::Pass,
        }
    }
}
