//! Final fused signal emitted by the voting engine.

use crate::candidate::{SignalDirection, Target};
use crate::regime::RegimeSnapshot;
use crate::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Confidence band label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    /// Band thresholds: >= 0.8 HIGH, >= 0.6 MEDIUM, else LOW.
    #[must_use]
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// How the validator gauntlet treated the candidate slate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VetoStatus {
    /// No candidate was vetoed.
    Clear,
    /// Some candidates were vetoed; others survived.
    Partial,
    /// Every candidate was vetoed or failed validation.
    AllVetoed,
}

/// One scale-out step in an execution plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleOut {
    /// Ladder position, 1-based.
    pub level: u32,
    pub price: Decimal,
    /// Fraction of the position to close at this level.
    pub fraction: f64,
}

/// Concrete trade plan derived from the winning candidate's levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub action: SignalDirection,
    pub entry: Decimal,
    pub stop_loss: Decimal,
    pub scale_outs: Vec<ScaleOut>,
    /// Bars after which the plan should be considered stale.
    pub valid_for_bars: u32,
}

/// The fused decision for one `(symbol, timeframe)` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSignal {
    pub signal_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub decision: SignalDirection,
    /// Calibrated confidence, capped at 0.99.
    pub confidence: f64,
    pub label: ConfidenceLabel,
    pub entry: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub targets: Vec<Target>,
    pub risk_reward: Option<f64>,
    pub supporting_agents: Vec<String>,
    pub opposing_agents: Vec<String>,
    pub veto_status: VetoStatus,
    pub veto_reasons: Vec<String>,
    pub regime: Option<RegimeSnapshot>,
    pub execution_plan: Option<ExecutionPlan>,
    pub generated_at: DateTime<Utc>,
}

impl FinalSignal {
    /// A NEUTRAL signal carrying a degradation reason. Used for the
    /// deadline, no-candidates, and all-vetoed paths.
    #[must_use]
    pub fn neutral(symbol: impl Into<String>, timeframe: Timeframe, reason: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let generated_at = Utc::now();
        Self {
            signal_id: make_signal_id(&symbol, timeframe, generated_at),
            symbol,
            timeframe,
            decision: SignalDirection::Neutral,
            confidence: 0.0,
            label: ConfidenceLabel::Low,
            entry: None,
            stop_loss: None,
            targets: Vec::new(),
            risk_reward: None,
            supporting_agents: Vec::new(),
            opposing_agents: Vec::new(),
            veto_status: VetoStatus::Clear,
            veto_reasons: vec![reason.into()],
            regime: None,
            execution_plan: None,
            generated_at,
        }
    }

    /// Sets the veto status on a degradation signal.
    #[must_use]
    pub fn with_veto_status(mut self, status: VetoStatus) -> Self {
        self.veto_status = status;
        self
    }

    /// Attaches the regime snapshot.
    #[must_use]
    pub fn with_regime(mut self, regime: RegimeSnapshot) -> Self {
        self.regime = Some(regime);
        self
    }
}

/// Deterministic-enough signal identity: symbol, timeframe, and emission
/// time at millisecond resolution.
#[must_use]
pub fn make_signal_id(symbol: &str, timeframe: Timeframe, at: DateTime<Utc>) -> String {
    format!("{symbol}-{timeframe}-{}", at.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_bands_match_thresholds() {
        assert_eq!(ConfidenceLabel::from_confidence(0.99), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_confidence(0.8), ConfidenceLabel::High);
        assert_eq!(
            ConfidenceLabel::from_confidence(0.7999),
            ConfidenceLabel::Medium
        );
        assert_eq!(ConfidenceLabel::from_confidence(0.6), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_confidence(0.5999), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::from_confidence(0.0), ConfidenceLabel::Low);
    }

    #[test]
    fn neutral_signal_carries_reason() {
        let signal = FinalSignal::neutral("EURUSD", Timeframe::H1, "no_candidates");
        assert_eq!(signal.decision, SignalDirection::Neutral);
        assert_eq!(signal.label, ConfidenceLabel::Low);
        assert_eq!(signal.veto_reasons, vec!["no_candidates".to_string()]);
        assert!(signal.execution_plan.is_none());
        assert!(signal.signal_id.starts_with("EURUSD-H1-"));
    }

    #[test]
    fn veto_status_wire_form() {
        let json = serde_json::to_string(&VetoStatus::AllVetoed).unwrap();
        assert_eq!(json, "\"all_vetoed\"");
    }

    #[test]
    fn signal_id_embeds_symbol_and_timeframe() {
        let at = Utc::now();
        let id = make_signal_id("GBPJPY", Timeframe::M15, at);
        assert_eq!(
            id,
            format!("GBPJPY-M15-{}", at.timestamp_millis())
        );
    }
}
