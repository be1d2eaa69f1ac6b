//! Normalized specialist output.
//!
//! Every detector payload, whatever its raw shape, is normalized into a
//! [`Candidate`] before it reaches the validators and the voting engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a candidate or final signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDirection {
    Buy,
    Sell,
    Neutral,
}

impl SignalDirection {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
            Self::Neutral => Self::Neutral,
        }
    }

    /// Returns true if this direction has a directional bias.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        !matches!(self, Self::Neutral)
    }

    /// Wire form (`BUY`, `SELL`, `NEUTRAL`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy family a specialist belongs to.
///
/// The validators and the regime multiplier key off these families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    TrendFollowing,
    MeanReversion,
    Breakout,
    Scalping,
    Momentum,
    SmartMoney,
    Volume,
    Pattern,
    Other,
}

impl StrategyCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrendFollowing => "trend_following",
            Self::MeanReversion => "mean_reversion",
            Self::Breakout => "breakout",
            Self::Scalping => "scalping",
            Self::Momentum => "momentum",
            Self::SmartMoney => "smart_money",
            Self::Volume => "volume",
            Self::Pattern => "pattern",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One take-profit level in a candidate's target ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Ladder position, 1-based.
    pub level: u32,
    pub price: Decimal,
    /// Risk-reward ratio of this level relative to entry and stop.
    pub rr: f64,
}

/// Validation failures for candidates.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CandidateError {
    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("entry equals stop loss ({0})")]
    ZeroRisk(Decimal),

    #[error("target level {level} at {price} not monotone for {direction}")]
    NonMonotoneTargets {
        level: u32,
        price: Decimal,
        direction: SignalDirection,
    },
}

/// Normalized output of one specialist invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub agent_id: String,
    pub strategy_name: String,
    pub category: StrategyCategory,
    pub direction: SignalDirection,
    /// Self-reported confidence, normalized to [0, 1].
    pub confidence: f64,
    pub entry: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub targets: Vec<Target>,
    /// Free-text justifications from the detector.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Raw detector payload fields preserved verbatim.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Candidate {
    /// Creates a voting-only candidate with no trade levels.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        strategy_name: impl Into<String>,
        category: StrategyCategory,
        direction: SignalDirection,
        confidence: f64,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            strategy_name: strategy_name.into(),
            category,
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            entry: None,
            stop_loss: None,
            targets: Vec::new(),
            evidence: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Sets entry and stop.
    #[must_use]
    pub fn with_levels(mut self, entry: Decimal, stop_loss: Decimal) -> Self {
        self.entry = Some(entry);
        self.stop_loss = Some(stop_loss);
        self
    }

    /// Appends one target level.
    #[must_use]
    pub fn with_target(mut self, level: u32, price: Decimal, rr: f64) -> Self {
        self.targets.push(Target { level, price, rr });
        self
    }

    /// Appends one evidence line.
    #[must_use]
    pub fn with_evidence(mut self, line: impl Into<String>) -> Self {
        self.evidence.push(line.into());
        self
    }

    /// A candidate is executable when it carries both entry and stop.
    /// Non-executable candidates still vote.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.direction.is_directional() && self.entry.is_some() && self.stop_loss.is_some()
    }

    /// Returns true when entry and stop are present and equal.
    #[must_use]
    pub fn has_zero_risk(&self) -> bool {
        matches!((self.entry, self.stop_loss), (Some(e), Some(s)) if e == s)
    }

    /// Risk-reward ratio to the last target: `|target - entry| / |entry - stop|`.
    ///
    /// Returns `None` when entry, stop, or targets are missing, or risk is zero.
    #[must_use]
    pub fn risk_reward(&self) -> Option<f64> {
        let entry = self.entry?;
        let stop = self.stop_loss?;
        let last = self.targets.last()?;
        let risk = (entry - stop).abs();
        if risk.is_zero() {
            return None;
        }
        let ratio = (last.price - entry).abs() / risk;
        ratio.to_string().parse::<f64>().ok()
    }

    /// Checks the candidate invariants.
    ///
    /// # Errors
    /// Returns an error for out-of-range confidence, zero risk on a
    /// directional candidate, or a target ladder that is not monotone in
    /// the candidate's direction.
    pub fn validate(&self) -> Result<(), CandidateError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(CandidateError::ConfidenceOutOfRange(self.confidence));
        }

        if self.direction.is_directional() && self.has_zero_risk() {
            // has_zero_risk implies entry is present
            return Err(CandidateError::ZeroRisk(self.entry.unwrap_or_default()));
        }

        if let Some(entry) = self.entry {
            let mut prev = entry;
            for target in &self.targets {
                let monotone = match self.direction {
                    SignalDirection::Buy => target.price > prev,
                    SignalDirection::Sell => target.price < prev,
                    SignalDirection::Neutral => true,
                };
                if !monotone {
                    return Err(CandidateError::NonMonotoneTargets {
                        level: target.level,
                        price: target.price,
                        direction: self.direction,
                    });
                }
                prev = target.price;
            }
        }

        Ok(())
    }
}
