//! Engine configuration tree.
//!
//! Every tunable named by the external interface is here, with its
//! documented default. Sections deserialize independently so a partial
//! TOML file overrides only what it names.

use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub validators: ValidatorConfig,
}

/// Historical cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root of the persisted state layout (`parquet/`, `metadata/`,
    /// `learning/` live beneath it).
    pub data_dir: PathBuf,
    /// Frames younger than this are served without a provider round-trip.
    pub max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            max_age_hours: 24,
        }
    }
}

/// Pipeline scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Specialist fan-out parallelism. Defaults to min(5, CPU count).
    pub parallelism: usize,
    /// Per-detector timeout inside the fan-out.
    pub detector_timeout_ms: u64,
    /// Higher timeframes fetched alongside the requested one.
    pub htf_timeframes: Vec<Timeframe>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            detector_timeout_ms: 2_000,
            htf_timeframes: vec![Timeframe::H4, Timeframe::D1],
        }
    }
}

/// min(5, CPU count), floor 1.
#[must_use]
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(5)
        .max(1)
}

/// Voting engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Confidence saturation normalizer K. Empirical; the winning score
    /// divided by K caps at 0.99.
    pub reference_k: f64,
    /// When `|buy - sell| / (buy + sell)` falls below this, force NEUTRAL.
    pub tie_break_epsilon: f64,
    /// Regime multiplier applied to favored strategy families.
    pub regime_boost: f64,
    /// Lifetime of an emitted execution plan, in bars.
    pub valid_for_bars: u32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            reference_k: 3.0,
            tie_break_epsilon: 0.05,
            regime_boost: 1.2,
            valid_for_bars: 12,
        }
    }
}

/// Adaptive learner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Outcomes required before any weight update runs.
    pub min_samples: usize,
    /// Weight updates run on every Nth ledger append past `min_samples`.
    pub update_interval: usize,
    /// Smoothing factor for the weight step.
    pub learning_rate: f64,
    /// Outcome window evaluated on each update.
    pub lookback_days: i64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_samples: 50,
            update_interval: 10,
            learning_rate: 0.05,
            lookback_days: 30,
        }
    }
}

/// Validator gauntlet toggles and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub trend_enabled: bool,
    pub risk_enabled: bool,
    pub volatility_enabled: bool,
    pub regime_consistency_enabled: bool,
    pub news_enabled: bool,
    /// Soft-fail floor for risk-reward to the last target.
    pub min_risk_reward: f64,
    /// Hard-veto ceiling; ratios above this are implausible.
    pub max_risk_reward: f64,
    /// Hard-veto window around major scheduled events, in minutes.
    pub news_window_minutes: i64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            trend_enabled: true,
            risk_enabled: true,
            volatility_enabled: true,
            regime_consistency_enabled: true,
            news_enabled: true,
            min_risk_reward: 1.5,
            max_risk_reward: 5.0,
            news_window_minutes: 30,
        }
    }
}
