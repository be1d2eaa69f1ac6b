//! RSI extreme fade.

use super::dec;
use crate::signal::{RawSignal, RawSignals};
use crate::specialist::{DetectContext, Specialist, SpecialistDescriptor};
use async_trait::async_trait;
use confluence_core::{StrategyCategory, TrendRegime};
use confluence_regime::kernels::{atr, last_valid, rsi, sma};

const MIN_BARS: usize = 30;
const RSI_PERIOD: usize = 14;
const OVERSOLD: f64 = 30.0;
const OVERBOUGHT: f64 = 70.0;
const SWING_LOOKBACK: usize = 10;

/// Fades RSI extremes back toward the 20-bar mean.
///
/// Reports confidence on the detector's native 0-100 scale; the
/// normalization boundary rescales it.
pub struct RsiFadeDetector {
    descriptor: SpecialistDescriptor,
}

impl Default for RsiFadeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl RsiFadeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "meanrev_rsi_01",
                "rsi_fade",
                StrategyCategory::MeanReversion,
                vec![TrendRegime::Ranging],
            ),
        }
    }
}

#[async_trait]
impl Specialist for RsiFadeDetector {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        let frame = ctx.frame.as_ref();
        let n = frame.len();
        if n < MIN_BARS {
            return Ok(RawSignals::none());
        }

        let rsi_last = match last_valid(&rsi(&frame.close, RSI_PERIOD)) {
            Some(v) => v,
            None => return Ok(RawSignals::none()),
        };
        let mean = last_valid(&sma(&frame.close, 20)).unwrap_or(frame.close[n - 1]);
        let range = last_valid(&atr(&frame.high, &frame.low, &frame.close, RSI_PERIOD))
            .unwrap_or(0.0);
        let close = frame.close[n - 1];

        let (direction, confidence_pct, stop, fade_ok) = if rsi_last < OVERSOLD {
            let swing_low = frame.low[n - SWING_LOOKBACK..]
                .iter()
                .copied()
                .fold(f64::MAX, f64::min);
            (
                "bullish",
                (55.0 + (OVERSOLD - rsi_last)).min(90.0),
                swing_low - 0.25 * range,
                mean > close,
            )
        } else if rsi_last > OVERBOUGHT {
            let swing_high = frame.high[n - SWING_LOOKBACK..]
                .iter()
                .copied()
                .fold(f64::MIN, f64::max);
            (
                "bearish",
                (55.0 + (rsi_last - OVERBOUGHT)).min(90.0),
                swing_high + 0.25 * range,
                mean < close,
            )
        } else {
            return Ok(RawSignals::none());
        };

        let mut signal = RawSignal::new(direction, confidence_pct)
            .with_evidence(format!("rsi{RSI_PERIOD} at {rsi_last:.1}"))
            .with_extra("rsi", serde_json::json!(rsi_last));

        // The fade targets the mean; when price already sits on the
        // wrong side of it the signal votes without trade levels.
        if fade_ok {
            if let (Some(entry), Some(stop), Some(target)) = (dec(close), dec(stop), dec(mean)) {
                if entry != stop {
                    signal = signal.with_levels(entry, stop).with_target(target);
                }
            }
        }

        Ok(RawSignals::Flat(vec![signal]))
    }
}
