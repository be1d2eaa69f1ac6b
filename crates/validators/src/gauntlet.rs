//! Runs every validator against a candidate and folds the verdicts
//! into one report.

use crate::rules::{
    NewsValidator, RegimeConsistencyValidator, RiskValidator, TrendValidator, VolatilityValidator,
};
use crate::validator::{Validator, Verdict};
use confluence_core::{Candidate, Frame, RegimeSnapshot, ValidatorConfig};
use serde::Serialize;
use std::collections::BTreeMap;

/// Full audit trail for one candidate. Attached to the final signal
/// for explainability.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// True iff no veto was raised and at least one validator passed.
    pub passed: bool,
    pub votes: BTreeMap<String, bool>,
    pub veto: bool,
    pub veto_reasons: Vec<String>,
}

/// Ordered set of validators a candidate must survive.
#[derive(Default)]
pub struct ValidatorGauntlet {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorGauntlet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the shipped validator set honoring the per-validator
    /// toggles. The regime-consistency validator comes back empty;
    /// callers declare strategies on it before wiring.
    #[must_use]
    pub fn from_config(
        config: &ValidatorConfig,
        regime_consistency: RegimeConsistencyValidator,
        news: NewsValidator,
    ) -> Self {
        let mut gauntlet = Self::new();
        if config.trend_enabled {
            gauntlet.push(Box::new(TrendValidator));
        }
        if config.risk_enabled {
            gauntlet.push(Box::new(RiskValidator::new(
                config.min_risk_reward,
                config.max_risk_reward,
            )));
        }
        if config.volatility_enabled {
            gauntlet.push(Box::new(VolatilityValidator));
        }
        if config.regime_consistency_enabled {
            gauntlet.push(Box::new(regime_consistency));
        }
        if config.news_enabled {
            gauntlet.push(Box::new(news));
        }
        gauntlet
    }

    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Audits one candidate. Every validator votes; the report carries
    /// the full vote map.
    #[must_use]
    pub fn validate(
        &self,
        candidate: &Candidate,
        frame: &Frame,
        regime: &RegimeSnapshot,
    ) -> ValidationReport {
        let mut votes = BTreeMap::new();
        let mut veto_reasons = Vec::new();

        for validator in &self.validators {
            let verdict = validator.audit(candidate, frame, regime);
            votes.insert(validator.name().to_string(), verdict.is_pass());
            match verdict {
                Verdict::Pass => {}
                Verdict::Fail(reason) => {
                    tracing::debug!(
                        validator = validator.name(),
                        agent_id = %candidate.agent_id,
                        %reason,
                        "validator failed candidate"
                    );
                }
                Verdict::Veto(reason) => {
                    tracing::warn!(
                        validator = validator.name(),
                        agent_id = %candidate.agent_id,
                        %reason,
                        "validator vetoed candidate"
                    );
                    veto_reasons.push(reason);
                }
            }
        }

        let veto = !veto_reasons.is_empty();
        let passed = !veto && votes.values().any(|&ok| ok);
        ValidationReport {
            passed,
            votes,
            veto,
            veto_reasons,
        }
    }
}
