//! Weighted voting engine.
//!
//! Fuses a validated candidate slate into one [`FinalSignal`]. Scores
//! are `confidence x base_weight x regime_multiplier`, summed per
//! direction; the winning mass is calibrated against the reference
//! normalizer and capped below certainty. The slate is re-sorted into
//! canonical order first, so fusion is a pure function of its inputs.

use chrono::Utc;
use confluence_core::{
    make_signal_id, Candidate, ConfidenceLabel, ExecutionPlan, FinalSignal, FusionConfig,
    RegimeSnapshot, ScaleOut, SignalDirection, StrategyCategory, Timeframe, VetoStatus,
};
use confluence_learning::WeightSnapshot;
use confluence_validators::ValidationReport;
use std::collections::BTreeSet;

pub struct VotingEngine {
    config: FusionConfig,
}

impl VotingEngine {
    #[must_use]
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Fuses one slate into a final signal.
    ///
    /// Every candidate arrives paired with its validation report;
    /// vetoed and failed candidates are excluded from the vote but
    /// their reasons survive into the output.
    #[must_use]
    pub fn fuse(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        slate: &[(Candidate, ValidationReport)],
        regime: &RegimeSnapshot,
        weights: &WeightSnapshot,
    ) -> FinalSignal {
        if slate.is_empty() {
            return FinalSignal::neutral(symbol, timeframe, "no_candidates")
                .with_regime(regime.clone());
        }

        let mut veto_reasons: Vec<String> = slate
            .iter()
            .flat_map(|(_, report)| report.veto_reasons.iter().cloned())
            .collect();
        veto_reasons.dedup();

        let mut survivors: Vec<&Candidate> = slate
            .iter()
            .filter(|(_, report)| report.passed)
            .map(|(candidate, _)| candidate)
            .collect();
        if survivors.is_empty() {
            let mut signal =
                FinalSignal::neutral(symbol, timeframe, "no_candidates_passed_validation")
                    .with_veto_status(VetoStatus::AllVetoed)
                    .with_regime(regime.clone());
            signal.veto_reasons.extend(veto_reasons);
            return signal;
        }

        // Canonical order makes the fusion independent of arrival order.
        survivors.sort_by(|a, b| {
            (a.strategy_name.as_str(), a.direction).cmp(&(b.strategy_name.as_str(), b.direction))
        });

        let veto_status = if veto_reasons.is_empty() {
            VetoStatus::Clear
        } else {
            VetoStatus::Partial
        };

        let population = survivors
            .iter()
            .map(|c| c.strategy_name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut buy_mass = 0.0;
        let mut sell_mass = 0.0;
        for candidate in &survivors {
            let base = weights.specialist_weight(&candidate.strategy_name, population);
            let multiplier = self.regime_multiplier(candidate.category, regime);
            let score = candidate.confidence * base * multiplier;
            match candidate.direction {
                SignalDirection::Buy => buy_mass += score,
                SignalDirection::Sell => sell_mass += score,
                SignalDirection::Neutral => {}
            }
        }

        let total = buy_mass + sell_mass;
        if total <= 0.0 {
            let mut signal = FinalSignal::neutral(symbol, timeframe, "no_directional_votes")
                .with_veto_status(veto_status)
                .with_regime(regime.clone());
            signal.veto_reasons.extend(veto_reasons);
            return signal;
        }
        if (buy_mass - sell_mass).abs() / total < self.config.tie_break_epsilon {
            tracing::debug!(symbol, %timeframe, buy_mass, sell_mass, "vote tie, emitting neutral");
            let mut signal = FinalSignal::neutral(symbol, timeframe, "vote_tie")
                .with_veto_status(veto_status)
                .with_regime(regime.clone());
            signal.veto_reasons.extend(veto_reasons);
            return signal;
        }

        let (decision, winning_mass) = if buy_mass > sell_mass {
            (SignalDirection::Buy, buy_mass)
        } else {
            (SignalDirection::Sell, sell_mass)
        };
        let confidence = (winning_mass / self.config.reference_k).min(0.99);
        let label = ConfidenceLabel::from_confidence(confidence);

        let supporting_agents: Vec<String> = survivors
            .iter()
            .filter(|c| c.direction == decision)
            .map(|c| c.agent_id.clone())
            .collect();
        let opposing_agents: Vec<String> = survivors
            .iter()
            .filter(|c| c.direction == decision.opposite())
            .map(|c| c.agent_id.clone())
            .collect();

        let best = best_executable(&survivors, decision);
        let execution_plan = best.map(|c| self.build_plan(c, decision));

        let generated_at = Utc::now();
        let signal = FinalSignal {
            signal_id: make_signal_id(symbol, timeframe, generated_at),
            symbol: symbol.to_string(),
            timeframe,
            decision,
            confidence,
            label,
            entry: best.and_then(|c| c.entry),
            stop_loss: best.and_then(|c| c.stop_loss),
            targets: best.map(|c| c.targets.clone()).unwrap_or_default(),
            risk_reward: best.and_then(|c| c.risk_reward()),
            supporting_agents,
            opposing_agents,
            veto_status,
            veto_reasons,
            regime: Some(regime.clone()),
            execution_plan,
            generated_at,
        };
        tracing::info!(
            signal_id = %signal.signal_id,
            decision = %signal.decision,
            confidence = signal.confidence,
            supporting = signal.supporting_agents.len(),
            opposing = signal.opposing_agents.len(),
            "fused signal"
        );
        signal
    }

    /// Strategy families aligned with the regime get the boost:
    /// trend-followers under a strong directional bias, mean-reverters
    /// when the bias is flat.
    fn regime_multiplier(&self, category: StrategyCategory, regime: &RegimeSnapshot) -> f64 {
        match category {
            StrategyCategory::TrendFollowing if regime.has_strong_bias() => {
                self.config.regime_boost
            }
            StrategyCategory::MeanReversion
                if regime.bias == confluence_core::DirectionalBias::Neutral =>
            {
                self.config.regime_boost
            }
            _ => 1.0,
        }
    }

    /// Even scale-out ladder over the winner's targets, remainder on
    /// the last level.
    fn build_plan(&self, candidate: &Candidate, decision: SignalDirection) -> ExecutionPlan {
        let n = candidate.targets.len().max(1);
        let fraction = 1.0 / n as f64;
        let scale_outs: Vec<ScaleOut> = candidate
            .targets
            .iter()
            .enumerate()
            .map(|(i, target)| ScaleOut {
                level: target.level,
                price: target.price,
                fraction: if i + 1 == n {
                    1.0 - fraction * (n - 1) as f64
                } else {
                    fraction
                },
            })
            .collect();
        ExecutionPlan {
            action: decision,
            entry: candidate.entry.unwrap_or_default(),
            stop_loss: candidate.stop_loss.unwrap_or_default(),
            scale_outs,
            valid_for_bars: self.config.valid_for_bars,
        }
    }
}

/// Highest-confidence executable candidate on the winning side. Ties
/// resolve to the earliest in canonical order.
fn best_executable<'a>(
    survivors: &[&'a Candidate],
    decision: SignalDirection,
) -> Option<&'a Candidate> {
    survivors
        .iter()
        .copied()
        .filter(|c| c.direction == decision && c.is_executable())
        .fold(None, |best: Option<&Candidate>, c| match best {
            Some(b) if b.confidence >= c.confidence => Some(b),
            _ => Some(c),
        })
}
