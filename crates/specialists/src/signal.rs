//! Raw detector payloads, before normalization.
//!
//! Detectors emit loosely-shaped signals: a flat list or a map keyed by
//! sub-category. Fields beyond the known set are kept verbatim in a
//! flattened map so nothing a detector reports is lost.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One raw signal leaf as a detector produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSignal {
    /// Detector-native direction string (`bullish`, `bearish`, ...).
    pub direction: Option<String>,
    /// Detector-native confidence, on either a 0-1 or 0-100 scale.
    pub confidence: Option<f64>,
    pub entry: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub targets: Vec<Decimal>,
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Everything else the detector reported.
    #[serde(flatten)]
    pub extras: serde_json::Map<String, Value>,
}

impl RawSignal {
    #[must_use]
    pub fn new(direction: impl Into<String>, confidence: f64) -> Self {
        Self {
            direction: Some(direction.into()),
            confidence: Some(confidence),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_levels(mut self, entry: Decimal, stop_loss: Decimal) -> Self {
        self.entry = Some(entry);
        self.stop_loss = Some(stop_loss);
        self
    }

    #[must_use]
    pub fn with_target(mut self, price: Decimal) -> Self {
        self.targets.push(price);
        self
    }

    #[must_use]
    pub fn with_evidence(mut self, line: impl Into<String>) -> Self {
        self.evidence.push(line.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// A detector's full output for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSignals {
    Flat(Vec<RawSignal>),
    Categorized(BTreeMap<String, Vec<RawSignal>>),
}

impl RawSignals {
    /// An empty flat payload, for detectors with no setup on this frame.
    #[must_use]
    pub fn none() -> Self {
        Self::Flat(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(list) => list.is_empty(),
            Self::Categorized(map) => map.values().all(Vec::is_empty),
        }
    }

    /// Flattens into `(sub_category, signal)` leaves. Flat payloads
    /// carry no sub-category.
    #[must_use]
    pub fn into_leaves(self) -> Vec<(Option<String>, RawSignal)> {
        match self {
            Self::Flat(list) => list.into_iter().map(|s| (None, s)).collect(),
            Self::Categorized(map) => map
                .into_iter()
                .flat_map(|(category, list)| {
                    list.into_iter()
                        .map(move |s| (Some(category.clone()), s))
                })
                .collect(),
        }
    }
}
