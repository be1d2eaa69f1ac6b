//! Market regime snapshot types.
//!
//! The regime classifier unions eight sub-classifiers into one
//! [`RegimeSnapshot`]; the validators and the voting engine consume it to
//! gate and re-weight candidates.

use crate::candidate::SignalDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend-versus-range verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendRegime {
    TrendingUp,
    TrendingDown,
    Ranging,
}

impl TrendRegime {
    #[must_use]
    pub const fn is_trending(self) -> bool {
        !matches!(self, Self::Ranging)
    }
}

/// ATR-percentile volatility band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Normal,
    High,
    Extreme,
}

/// EMA-derived directional bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionalBias {
    Bullish,
    Bearish,
    Neutral,
}

impl DirectionalBias {
    /// The trade direction this bias favors.
    #[must_use]
    pub const fn favored_direction(self) -> SignalDirection {
        match self {
            Self::Bullish => SignalDirection::Buy,
            Self::Bearish => SignalDirection::Sell,
            Self::Neutral => SignalDirection::Neutral,
        }
    }

    /// Returns true when `direction` trades against this bias.
    #[must_use]
    pub fn opposes(self, direction: SignalDirection) -> bool {
        match self {
            Self::Bullish => direction == SignalDirection::Sell,
            Self::Bearish => direction == SignalDirection::Buy,
            Self::Neutral => false,
        }
    }
}

/// How complete the EMA stack alignment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentTier {
    /// Price and all four EMAs stacked in order.
    Strong,
    /// Price on one side of EMA50 only.
    Moderate,
    Neutral,
}

/// ADX trend-strength band, signed by DI dominance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl TrendStrength {
    /// Band boundaries: <20 weak, 20-25 moderate, 25-50 strong, >50 very strong.
    #[must_use]
    pub fn from_adx(adx: f64) -> Self {
        if adx > 50.0 {
            Self::VeryStrong
        } else if adx > 25.0 {
            Self::Strong
        } else if adx >= 20.0 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }

    #[must_use]
    pub const fn is_strong(self) -> bool {
        matches!(self, Self::Strong | Self::VeryStrong)
    }
}

/// Wyckoff-style market phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    Accumulation,
    Markup,
    Distribution,
    Markdown,
    Compression,
    Explosion,
    Transition,
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accumulation => "accumulation",
            Self::Markup => "markup",
            Self::Distribution => "distribution",
            Self::Markdown => "markdown",
            Self::Compression => "compression",
            Self::Explosion => "explosion",
            Self::Transition => "transition",
        };
        f.write_str(s)
    }
}

/// Swing-structure tag over recent pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureTag {
    /// Higher highs and higher lows.
    HhHl,
    /// Lower highs and lower lows.
    LhLl,
    Ranging,
}

/// Raw indicator values the snapshot was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeIndicators {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub atr: f64,
    /// Percentile of the latest ATR within the trailing 100 bars, 0-100.
    pub atr_percentile: f64,
    pub bb_width: f64,
    /// Latest Bollinger width over its 50-bar mean.
    pub bb_width_ratio: f64,
    pub ema9: f64,
    pub ema21: f64,
    pub ema50: f64,
    pub ema200: f64,
    /// 50-bar close slope, in degrees.
    pub slope_deg: f64,
    pub structure: StructureTag,
}

impl Default for RegimeIndicators {
    fn default() -> Self {
        Self {
            adx: 0.0,
            plus_di: 0.0,
            minus_di: 0.0,
            atr: 0.0,
            atr_percentile: 50.0,
            bb_width: 0.0,
            bb_width_ratio: 1.0,
            ema9: 0.0,
            ema21: 0.0,
            ema50: 0.0,
            ema200: 0.0,
            slope_deg: 0.0,
            structure: StructureTag::Ranging,
        }
    }
}

/// One sub-classifier's contribution to the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubClassification {
    pub name: String,
    pub verdict: String,
    /// Confidence in this verdict, 0-100.
    pub confidence: f64,
    /// Short advisory consumed by the voting engine and attached for
    /// explainability.
    pub recommendation: String,
}

impl SubClassification {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        verdict: impl Into<String>,
        confidence: f64,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            verdict: verdict.into(),
            confidence: confidence.clamp(0.0, 100.0),
            recommendation: recommendation.into(),
        }
    }
}

/// Union of the eight sub-classifier results for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub trend: TrendRegime,
    /// Strength of the trend-vs-range verdict, 0-100.
    pub trend_score: f64,
    pub volatility: VolatilityLevel,
    pub bias: DirectionalBias,
    pub alignment: AlignmentTier,
    pub strength: TrendStrength,
    pub phase: MarketPhase,
    pub indicators: RegimeIndicators,
    pub sub_classifications: Vec<SubClassification>,
}

impl RegimeSnapshot {
    /// A flat, no-opinion snapshot. Used when classification is skipped
    /// and as a fixture base in tests.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            trend: TrendRegime::Ranging,
            trend_score: 0.0,
            volatility: VolatilityLevel::Normal,
            bias: DirectionalBias::Neutral,
            alignment: AlignmentTier::Neutral,
            strength: TrendStrength::Weak,
            phase: MarketPhase::Transition,
            indicators: RegimeIndicators::default(),
            sub_classifications: Vec::new(),
        }
    }

    /// Returns true in a Strong or VeryStrong directional regime.
    #[must_use]
    pub fn is_strong_trend(&self) -> bool {
        self.strength.is_strong() && self.trend.is_trending()
    }

    /// Returns true when the bias is directional and the trend strong;
    /// this is the condition under which trend-following strategies get
    /// their regime boost.
    #[must_use]
    pub fn has_strong_bias(&self) -> bool {
        self.bias != DirectionalBias::Neutral && self.strength.is_strong()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_strength_bands() {
        assert_eq!(TrendStrength::from_adx(10.0), TrendStrength::Weak);
        assert_eq!(TrendStrength::from_adx(20.0), TrendStrength::Moderate);
        assert_eq!(TrendStrength::from_adx(25.0), TrendStrength::Moderate);
        assert_eq!(TrendStrength::from_adx(30.0), TrendStrength::Strong);
        assert_eq!(TrendStrength::from_adx(50.0), TrendStrength::Strong);
        assert_eq!(TrendStrength::from_adx(60.0), TrendStrength::VeryStrong);
    }

    #[test]
    fn bias_opposition() {
        assert!(DirectionalBias::Bullish.opposes(SignalDirection::Sell));
        assert!(!DirectionalBias::Bullish.opposes(SignalDirection::Buy));
        assert!(DirectionalBias::Bearish.opposes(SignalDirection::Buy));
        assert!(!DirectionalBias::Neutral.opposes(SignalDirection::Sell));
        assert!(!DirectionalBias::Bearish.opposes(SignalDirection::Neutral));
    }

    #[test]
    fn volatility_levels_are_ordered() {
        assert!(VolatilityLevel::Low < VolatilityLevel::Normal);
        assert!(VolatilityLevel::High < VolatilityLevel::Extreme);
    }

    #[test]
    fn neutral_snapshot_has_no_strong_bias() {
        let snapshot = RegimeSnapshot::neutral();
        assert!(!snapshot.is_strong_trend());
        assert!(!snapshot.has_strong_bias());
    }

    #[test]
    fn strong_uptrend_snapshot() {
        let mut snapshot = RegimeSnapshot::neutral();
        snapshot.trend = TrendRegime::TrendingUp;
        snapshot.strength = TrendStrength::Strong;
        snapshot.bias = DirectionalBias::Bullish;
        assert!(snapshot.is_strong_trend());
        assert!(snapshot.has_strong_bias());
    }

    #[test]
    fn snapshot_wire_forms() {
        let json = serde_json::to_string(&RegimeSnapshot::neutral()).unwrap();
        assert!(json.contains("\"trend\":\"RANGING\""));
        assert!(json.contains("\"volatility\":\"normal\""));
        assert!(json.contains("\"phase\":\"transition\""));
    }

    #[test]
    fn sub_classification_confidence_clamped() {
        let sub = SubClassification::new("volatility", "extreme", 140.0, "stand aside");
        assert!((sub.confidence - 100.0).abs() < f64::EPSILON);
    }
}
