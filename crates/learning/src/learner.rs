//! Adaptive weight learner.
//!
//! Pure computation over the outcome window: per-strategy composite
//! scores, normalized to a target distribution, approached with a
//! smoothed step, then renormalized. Convergence is deliberately slow;
//! no weight reaches zero through learning alone.

use crate::error::StoreError;
use crate::ledger::OutcomeLedger;
use crate::weights::{WeightStore, WeightTables};
use chrono::{DateTime, Duration, Utc};
use confluence_core::{LearningConfig, OutcomeRecord, TradeOutcome};
use std::collections::BTreeMap;

/// Profit normalizer: an average of +50 pips maps to a full profit
/// score.
const PROFIT_SCALE: f64 = 50.0;
const WIN_RATE_WEIGHT: f64 = 0.6;
const PROFIT_WEIGHT: f64 = 0.4;

/// Aggregated performance of one strategy over the lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrategyPerformance {
    pub samples: usize,
    pub wins: usize,
    pub losses: usize,
    pub profit_sum: f64,
}

impl StrategyPerformance {
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.wins as f64 / self.samples as f64
        }
    }

    #[must_use]
    pub fn avg_profit(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.profit_sum / self.samples as f64
        }
    }

    /// Composite score: `0.6·win_rate + 0.4·clip(avg_profit/50, 0, 1)`.
    #[must_use]
    pub fn score(&self) -> f64 {
        let profit_component = (self.avg_profit() / PROFIT_SCALE).clamp(0.0, 1.0);
        WIN_RATE_WEIGHT * self.win_rate() + PROFIT_WEIGHT * profit_component
    }
}

/// What one update pass did, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub window_records: usize,
    /// Strategy name to (old weight, new weight), specialist tier.
    pub specialist_changes: BTreeMap<String, (f64, f64)>,
    /// Validator name to (old weight, new weight).
    pub validator_changes: BTreeMap<String, (f64, f64)>,
}

/// Single writer of the weight store.
pub struct AdaptiveLearner {
    config: LearningConfig,
}

impl AdaptiveLearner {
    #[must_use]
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    /// True when the ledger length is on the configured update cadence.
    #[must_use]
    pub fn due(&self, ledger_len: usize) -> bool {
        ledger_len >= self.config.min_samples
            && self.config.update_interval > 0
            && ledger_len % self.config.update_interval == 0
    }

    /// Recomputes both weight tiers from the outcome window ending at
    /// `now` and persists the result.
    ///
    /// # Errors
    /// Returns an error only when persistence fails; an empty window
    /// leaves the store untouched.
    pub fn update(
        &self,
        ledger: &OutcomeLedger,
        store: &WeightStore,
        now: DateTime<Utc>,
    ) -> Result<UpdateReport, StoreError> {
        let since = now - Duration::days(self.config.lookback_days);
        let window = ledger.window(since);
        if window.is_empty() {
            tracing::debug!("no outcomes in lookback window, skipping weight update");
            return Ok(UpdateReport::default());
        }

        let specialist_perf = specialist_performance(&window);
        let validator_perf = validator_performance(&window);

        let current = store.snapshot();
        let (specialist, specialist_changes) = step_tier(
            &current.specialist,
            &specialist_perf,
            self.config.learning_rate,
        );
        let (validator, validator_changes) = step_tier(
            &current.validator,
            &validator_perf,
            self.config.learning_rate,
        );

        store.replace(WeightTables {
            specialist,
            validator,
        })?;

        tracing::info!(
            window_records = window.len(),
            specialists = specialist_changes.len(),
            validators = validator_changes.len(),
            "adaptive weights updated"
        );
        Ok(UpdateReport {
            window_records: window.len(),
            specialist_changes,
            validator_changes,
        })
    }
}

/// Specialist tier: a strategy's record counts when it voted for the
/// signal's actual direction.
fn specialist_performance(window: &[OutcomeRecord]) -> BTreeMap<String, StrategyPerformance> {
    let mut perf: BTreeMap<String, StrategyPerformance> = BTreeMap::new();
    for record in window {
        for vote in record.aligned_votes() {
            let entry = perf.entry(vote.strategy_name.clone()).or_default();
            entry.samples += 1;
            entry.profit_sum += record.profit_pips;
            match record.outcome {
                TradeOutcome::Win => entry.wins += 1,
                TradeOutcome::Loss => entry.losses += 1,
                TradeOutcome::Breakeven => {}
            }
        }
    }
    perf
}

/// Validator tier: a validator's record counts when it passed the
/// signal that was taken.
fn validator_performance(window: &[OutcomeRecord]) -> BTreeMap<String, StrategyPerformance> {
    let mut perf: BTreeMap<String, StrategyPerformance> = BTreeMap::new();
    for record in window {
        for vote in &record.validator_votes {
            if !vote.passed {
                continue;
            }
            let entry = perf.entry(vote.name.clone()).or_default();
            entry.samples += 1;
            entry.profit_sum += record.profit_pips;
            match record.outcome {
                TradeOutcome::Win => entry.wins += 1,
                TradeOutcome::Loss => entry.losses += 1,
                TradeOutcome::Breakeven => {}
            }
        }
    }
    perf
}

/// One smoothed step for a tier: normalize scores into a target
/// distribution, move each current weight `lr` of the way toward it,
/// renormalize so the tier sums to 1.
fn step_tier(
    current: &BTreeMap<String, f64>,
    perf: &BTreeMap<String, StrategyPerformance>,
    learning_rate: f64,
) -> (BTreeMap<String, f64>, BTreeMap<String, (f64, f64)>) {
    if perf.is_empty() {
        return (current.clone(), BTreeMap::new());
    }

    let score_sum: f64 = perf.values().map(StrategyPerformance::score).sum();
    let n = perf.len() as f64;
    let targets: BTreeMap<&str, f64> = perf
        .iter()
        .map(|(name, p)| {
            // All-zero scores degenerate to a uniform target.
            let target = if score_sum > 0.0 {
                p.score() / score_sum
            } else {
                1.0 / n
            };
            (name.as_str(), target)
        })
        .collect();

    let uniform = 1.0 / n;
    let mut stepped: BTreeMap<String, f64> = targets
        .iter()
        .map(|(name, target)| {
            let cur = current.get(*name).copied().unwrap_or(uniform);
            (name.to_string(), cur + learning_rate * (target - cur))
        })
        .collect();

    let total: f64 = stepped.values().sum();
    if total > 0.0 {
        for weight in stepped.values_mut() {
            *weight /= total;
        }
    }

    let changes = stepped
        .iter()
        .map(|(name, new)| {
            let old = current.get(name).copied().unwrap_or(uniform);
            (name.clone(), (old, *new))
        })
        .collect();
    (stepped, changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use confluence_core::{AgentVote, SignalDirection, ValidatorVote};
    use tempfile::TempDir;

    fn record(
        at: DateTime<Utc>,
        strategy: &str,
        outcome: TradeOutcome,
        profit: f64,
    ) -> OutcomeRecord {
        OutcomeRecord {
            signal_id: format!("EURUSD-H1-{}", at.timestamp_millis()),
            timestamp: at,
            symbol: "EURUSD".to_string(),
            direction: SignalDirection::Buy,
            agent_votes: vec![AgentVote {
                agent_id: format!("{strategy}_id"),
                strategy_name: strategy.to_string(),
                direction: SignalDirection::Buy,
                confidence: 0.8,
            }],
            validator_votes: vec![ValidatorVote {
                name: "risk".to_string(),
                passed: true,
            }],
            outcome,
            profit_pips: profit,
        }
    }

    fn config() -> LearningConfig {
        LearningConfig::default()
    }

    #[test]
    fn composite_score_formula() {
        let perf = StrategyPerformance {
            samples: 10,
            wins: 8,
            losses: 2,
            profit_sum: 300.0,
        };
        // win_rate 0.8, avg_profit 30 -> 0.6*0.8 + 0.4*0.6 = 0.72
        assert!((perf.score() - 0.72).abs() < 1e-12);

        let losing = StrategyPerformance {
            samples: 10,
            wins: 4,
            losses: 6,
            profit_sum: -100.0,
        };
        // negative avg profit clips to 0 -> 0.6*0.4
        assert!((losing.score() - 0.24).abs() < 1e-12);
    }

    #[test]
    fn cadence_gates_on_min_samples_then_interval() {
        let learner = AdaptiveLearner::new(config());
        assert!(!learner.due(49));
        assert!(learner.due(50));
        assert!(!learner.due(51));
        assert!(learner.due(60));
        assert!(!learner.due(59));
    }

    /// The ledger scenario: A wins 80% at +30 avg, B wins 40% at -10
    /// avg, both starting at 0.5.
    #[test]
    fn smoothed_step_is_exact() {
        let dir = TempDir::new().unwrap();
        let ledger = OutcomeLedger::open(dir.path().join("performance.json")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let at = now - Duration::days(1);

        for i in 0..25 {
            let (outcome, profit) = if i < 20 {
                (TradeOutcome::Win, 30.0)
            } else {
                (TradeOutcome::Loss, 30.0)
            };
            ledger.append(record(at, "strategy_a", outcome, profit)).unwrap();
        }
        for i in 0..25 {
            let (outcome, profit) = if i < 10 {
                (TradeOutcome::Win, -10.0)
            } else {
                (TradeOutcome::Loss, -10.0)
            };
            ledger.append(record(at, "strategy_b", outcome, profit)).unwrap();
        }

        let store = WeightStore::open(dir.path().join("optimized_weights.json"));
        store
            .replace(WeightTables {
                specialist: [("strategy_a".to_string(), 0.5), ("strategy_b".to_string(), 0.5)]
                    .into_iter()
                    .collect(),
                validator: BTreeMap::new(),
            })
            .unwrap();

        let learner = AdaptiveLearner::new(config());
        let report = learner.update(&ledger, &store, now).unwrap();
        assert_eq!(report.window_records, 50);

        // score_a = 0.6*0.8 + 0.4*clip(30/50) = 0.72
        // score_b = 0.6*0.4 + 0.4*clip(-10/50) = 0.24
        // targets: 0.75 / 0.25; step: 0.5 + 0.05*(target - 0.5)
        let snapshot = store.snapshot();
        let a = snapshot.specialist["strategy_a"];
        let b = snapshot.specialist["strategy_b"];
        assert!((a - 0.5125).abs() < 1e-9, "a was {a}");
        assert!((b - 0.4875).abs() < 1e-9, "b was {b}");
        assert!((a + b - 1.0).abs() < 1e-9);

        let (old_a, new_a) = report.specialist_changes["strategy_a"];
        assert!((old_a - 0.5).abs() < 1e-12);
        assert!((new_a - a).abs() < 1e-12);
    }

    #[test]
    fn tier_sums_stay_normalized_and_positive_across_updates() {
        let dir = TempDir::new().unwrap();
        let ledger = OutcomeLedger::open(dir.path().join("performance.json")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let at = now - Duration::days(2);

        for _ in 0..30 {
            ledger.append(record(at, "winner", TradeOutcome::Win, 40.0)).unwrap();
            ledger.append(record(at, "loser", TradeOutcome::Loss, -20.0)).unwrap();
        }

        let store = WeightStore::open(dir.path().join("w.json"));
        let learner = AdaptiveLearner::new(config());
        for _ in 0..50 {
            learner.update(&ledger, &store, now).unwrap();
        }

        let snapshot = store.snapshot();
        let sum: f64 = snapshot.specialist.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for (name, &w) in &snapshot.specialist {
            assert!(w > 0.0, "{name} hit zero");
        }
        // The loser converges toward its target but never to zero.
        assert!(snapshot.specialist["loser"] > 0.0);
        assert!(snapshot.specialist["winner"] > snapshot.specialist["loser"]);
    }

    #[test]
    fn empty_window_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let ledger = OutcomeLedger::open(dir.path().join("performance.json")).unwrap();
        let store = WeightStore::open(dir.path().join("w.json"));
        let learner = AdaptiveLearner::new(config());

        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let report = learner.update(&ledger, &store, now).unwrap();
        assert_eq!(report.window_records, 0);
        assert!(store.snapshot().specialist.is_empty());
    }

    #[test]
    fn validator_tier_learns_from_passed_votes() {
        let dir = TempDir::new().unwrap();
        let ledger = OutcomeLedger::open(dir.path().join("performance.json")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let at = now - Duration::days(1);

        for _ in 0..10 {
            ledger.append(record(at, "s", TradeOutcome::Win, 25.0)).unwrap();
        }

        let store = WeightStore::open(dir.path().join("w.json"));
        AdaptiveLearner::new(config()).update(&ledger, &store, now).unwrap();

        let snapshot = store.snapshot();
        // Single validator in play: its weight normalizes to 1.
        assert!((snapshot.validator["risk"] - 1.0).abs() < 1e-9);
    }
}
