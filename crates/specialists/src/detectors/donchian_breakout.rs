//! Donchian channel breakout.

use super::dec;
use crate::signal::{RawSignal, RawSignals};
use crate::specialist::{DetectContext, Specialist, SpecialistDescriptor};
use async_trait::async_trait;
use confluence_core::{StrategyCategory, TrendRegime};
use confluence_regime::kernels::{atr, donchian, last_valid};
use std::collections::BTreeMap;

const MIN_BARS: usize = 30;
const CHANNEL_PERIOD: usize = 20;
const ATR_PERIOD: usize = 14;

/// Breakout of the 20-bar Donchian channel, stop at the channel mid.
///
/// Emits a categorized payload so the adapter's sub-category path is
/// exercised by a real detector.
pub struct DonchianBreakoutDetector {
    descriptor: SpecialistDescriptor,
}

impl Default for DonchianBreakoutDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DonchianBreakoutDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "breakout_donchian_01",
                "donchian_breakout",
                StrategyCategory::Breakout,
                vec![TrendRegime::TrendingUp, TrendRegime::TrendingDown],
            ),
        }
    }
}

#[async_trait]
impl Specialist for DonchianBreakoutDetector {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        let frame = ctx.frame.as_ref();
        let n = frame.len();
        if n < MIN_BARS {
            return Ok(RawSignals::none());
        }

        let channel = donchian(&frame.high, &frame.low, CHANNEL_PERIOD);
        let (upper, lower, mid) = (channel.upper[n - 1], channel.lower[n - 1], channel.mid[n - 1]);
        if !upper.is_finite() || !lower.is_finite() {
            return Ok(RawSignals::none());
        }
        let range = last_valid(&atr(&frame.high, &frame.low, &frame.close, ATR_PERIOD))
            .unwrap_or(0.0);
        if range <= 0.0 {
            return Ok(RawSignals::none());
        }
        let close = frame.close[n - 1];

        let (category, direction, penetration, sign) = if close > upper {
            ("breakout_up", "bullish", (close - upper) / range, 1.0)
        } else if close < lower {
            ("breakout_down", "bearish", (lower - close) / range, -1.0)
        } else {
            return Ok(RawSignals::none());
        };

        let confidence = 0.6 + 0.1 * penetration.min(2.0);
        let risk = (close - mid).abs();
        let mut signal = RawSignal::new(direction, confidence)
            .with_evidence(format!(
                "close {close:.5} cleared {CHANNEL_PERIOD}-bar channel by {penetration:.2} ATR"
            ))
            .with_extra("channel_upper", serde_json::json!(upper))
            .with_extra("channel_lower", serde_json::json!(lower));

        if risk > 0.0 {
            if let (Some(entry), Some(stop), Some(t1), Some(t2)) = (
                dec(close),
                dec(mid),
                dec(close + sign * risk),
                dec(close + sign * 2.0 * risk),
            ) {
                signal = signal.with_levels(entry, stop).with_target(t1).with_target(t2);
            }
        }

        let mut map = BTreeMap::new();
        map.insert(category.to_string(), vec![signal]);
        Ok(RawSignals::Categorized(map))
    }
}
