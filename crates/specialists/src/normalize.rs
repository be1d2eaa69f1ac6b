//! Normalization boundary between raw detector payloads and
//! [`Candidate`]s.

use crate::signal::{RawSignal, RawSignals};
use crate::specialist::SpecialistDescriptor;
use confluence_core::{Candidate, SignalDirection};
use rust_decimal::prelude::ToPrimitive;

/// Converts a detector payload into candidates.
///
/// Leaves missing a direction or a confidence are dropped with a log
/// line; unknown direction strings become NEUTRAL; confidence scale is
/// inferred (values above 1 are read as 0-100) and clamped. Unknown
/// payload fields land in the candidate's `metadata`.
#[must_use]
pub fn normalize(descriptor: &SpecialistDescriptor, raw: RawSignals) -> Vec<Candidate> {
    raw.into_leaves()
        .into_iter()
        .filter_map(|(sub_category, leaf)| normalize_leaf(descriptor, sub_category, leaf))
        .collect()
}

fn normalize_leaf(
    descriptor: &SpecialistDescriptor,
    sub_category: Option<String>,
    leaf: RawSignal,
) -> Option<Candidate> {
    let Some(direction_raw) = leaf.direction else {
        tracing::warn!(
            agent_id = %descriptor.agent_id,
            "dropping raw signal without direction"
        );
        return None;
    };
    let Some(confidence_raw) = leaf.confidence else {
        tracing::warn!(
            agent_id = %descriptor.agent_id,
            direction = %direction_raw,
            "dropping raw signal without confidence"
        );
        return None;
    };

    let direction = parse_direction(&direction_raw);
    let confidence = infer_confidence_scale(confidence_raw);

    let mut candidate = Candidate::new(
        descriptor.agent_id.clone(),
        descriptor.strategy_name.clone(),
        descriptor.category,
        direction,
        confidence,
    );

    if let (Some(entry), Some(stop)) = (leaf.entry, leaf.stop_loss) {
        candidate = candidate.with_levels(entry, stop);
        let risk = (entry - stop).abs();
        for (i, price) in leaf.targets.iter().enumerate() {
            let rr = if risk.is_zero() {
                0.0
            } else {
                ((*price - entry).abs() / risk)
                    .to_f64()
                    .unwrap_or(0.0)
            };
            candidate = candidate.with_target(i as u32 + 1, *price, rr);
        }
    }

    candidate.evidence = leaf.evidence;
    candidate.metadata = leaf.extras;
    if let Some(sub) = sub_category {
        candidate
            .metadata
            .insert("sub_category".into(), serde_json::Value::String(sub));
    }

    Some(candidate)
}

/// Detector-native direction strings. Anything unrecognized is a
/// NEUTRAL vote, not a dropped signal.
fn parse_direction(raw: &str) -> SignalDirection {
    match raw.to_ascii_lowercase().as_str() {
        "bullish" | "buy" | "long" => SignalDirection::Buy,
        "bearish" | "sell" | "short" => SignalDirection::Sell,
        _ => SignalDirection::Neutral,
    }
}

/// Values above 1 are read as a 0-100 scale; everything is clamped
/// into [0, 1].
fn infer_confidence_scale(raw: f64) -> f64 {
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}
