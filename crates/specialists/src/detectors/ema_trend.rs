//! EMA-stack trend rider.

use super::dec;
use crate::signal::{RawSignal, RawSignals};
use crate::specialist::{DetectContext, Specialist, SpecialistDescriptor};
use async_trait::async_trait;
use confluence_core::{Frame, StrategyCategory, TrendRegime};
use confluence_regime::kernels::{atr, ema, last_valid};

const MIN_BARS: usize = 30;
const FAST: usize = 9;
const SLOW: usize = 21;
const ATR_PERIOD: usize = 14;
/// Stop distance and first target, in ATRs.
const STOP_ATR: f64 = 1.5;

/// Rides an aligned 9/21 EMA stack, with a confidence bump per
/// higher timeframe that agrees.
pub struct EmaTrendRider {
    descriptor: SpecialistDescriptor,
}

impl Default for EmaTrendRider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmaTrendRider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "trend_ema_01",
                "ema_trend_rider",
                StrategyCategory::TrendFollowing,
                vec![TrendRegime::TrendingUp, TrendRegime::TrendingDown],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stack {
    Bullish,
    Bearish,
    Mixed,
}

fn stack_of(frame: &Frame) -> Stack {
    if frame.len() < MIN_BARS {
        return Stack::Mixed;
    }
    let fast = last_valid(&ema(&frame.close, FAST)).unwrap_or(0.0);
    let slow = last_valid(&ema(&frame.close, SLOW)).unwrap_or(0.0);
    let close = frame.close[frame.len() - 1];
    if close > fast && fast > slow {
        Stack::Bullish
    } else if close < fast && fast < slow {
        Stack::Bearish
    } else {
        Stack::Mixed
    }
}

#[async_trait]
impl Specialist for EmaTrendRider {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        let frame = ctx.frame.as_ref();
        if frame.len() < MIN_BARS {
            return Ok(RawSignals::none());
        }

        let stack = stack_of(frame);
        if stack == Stack::Mixed {
            return Ok(RawSignals::none());
        }

        let fast = last_valid(&ema(&frame.close, FAST)).unwrap_or(0.0);
        let slow = last_valid(&ema(&frame.close, SLOW)).unwrap_or(0.0);
        let range = last_valid(&atr(&frame.high, &frame.low, &frame.close, ATR_PERIOD))
            .unwrap_or(0.0);
        if range <= 0.0 {
            return Ok(RawSignals::none());
        }

        // Separation of the stack in ATRs drives base confidence.
        let separation = ((fast - slow).abs() / range).min(2.0);
        let mut confidence = 0.55 + 0.1 * separation;

        let mut signal = RawSignal::default();
        let close = frame.close[frame.len() - 1];
        let sign = if stack == Stack::Bullish { 1.0 } else { -1.0 };

        for htf in ctx.htf_frames() {
            if stack_of(htf) == stack {
                confidence += 0.05;
                signal = signal.with_evidence(format!(
                    "{} stack aligned on {}",
                    if sign > 0.0 { "bullish" } else { "bearish" },
                    htf.timeframe
                ));
            }
        }

        signal.direction = Some(if sign > 0.0 { "bullish" } else { "bearish" }.to_string());
        signal.confidence = Some(confidence.min(0.9));

        let stop = close - sign * STOP_ATR * range;
        let t1 = close + sign * STOP_ATR * range * 1.5;
        let t2 = close + sign * STOP_ATR * range * 3.0;
        if let (Some(entry), Some(stop), Some(t1), Some(t2)) =
            (dec(close), dec(stop), dec(t1), dec(t2))
        {
            signal = signal.with_levels(entry, stop).with_target(t1).with_target(t2);
        }
        signal = signal
            .with_evidence(format!("ema{FAST} {fast:.5} vs ema{SLOW} {slow:.5}"))
            .with_extra("atr", serde_json::json!(range));

        Ok(RawSignals::Flat(vec![signal]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use confluence_core::{FrameBuilder, Timeframe};
    use std::sync::Arc;

    fn frame_with_drift(n: usize, drift: f64, timeframe: Timeframe) -> Arc<Frame> {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let mut builder = FrameBuilder::new("EURUSD", timeframe);
        for i in 0..n {
            let close = 100.0 + i as f64 * drift;
            let open = if i == 0 { close } else { 100.0 + (i - 1) as f64 * drift };
            builder.push(
                start + Duration::hours(i as i64),
                open,
                open.max(close) + 0.2,
                open.min(close) - 0.2,
                close,
                1_000.0,
            );
        }
        Arc::new(builder.build())
    }

    #[tokio::test]
    async fn aligned_uptrend_emits_executable_bullish_signal() {
        let ctx = DetectContext::new(frame_with_drift(80, 0.5, Timeframe::H1));
        let raw = EmaTrendRider::new().detect(&ctx).await.unwrap();
        let leaves = raw.into_leaves();
        assert_eq!(leaves.len(), 1);
        let signal = &leaves[0].1;
        assert_eq!(signal.direction.as_deref(), Some("bullish"));
        assert!(signal.confidence.unwrap() > 0.55);
        assert!(signal.entry.is_some());
        assert_eq!(signal.targets.len(), 2);
        assert!(signal.targets[1] > signal.targets[0]);
    }

    #[tokio::test]
    async fn downtrend_emits_bearish_with_descending_targets() {
        let ctx = DetectContext::new(frame_with_drift(80, -0.5, Timeframe::H1));
        let raw = EmaTrendRider::new().detect(&ctx).await.unwrap();
        let signal = raw.into_leaves().remove(0).1;
        assert_eq!(signal.direction.as_deref(), Some("bearish"));
        assert!(signal.targets[1] < signal.targets[0]);
        assert!(signal.stop_loss.unwrap() > signal.entry.unwrap());
    }

    #[tokio::test]
    async fn htf_agreement_raises_confidence() {
        let ltf = frame_with_drift(80, 0.5, Timeframe::H1);
        let htf = frame_with_drift(80, 0.5, Timeframe::H4);

        let solo = DetectContext::new(Arc::clone(&ltf));
        let confirmed = DetectContext::new(ltf).with_htf(htf);

        let rider = EmaTrendRider::new();
        let base = rider.detect(&solo).await.unwrap().into_leaves().remove(0).1;
        let boosted = rider
            .detect(&confirmed)
            .await
            .unwrap()
            .into_leaves()
            .remove(0)
            .1;
        assert!(boosted.confidence.unwrap() > base.confidence.unwrap());
        assert!(!boosted.evidence.is_empty());
    }

    #[tokio::test]
    async fn flat_market_stays_silent() {
        let ctx = DetectContext::new(frame_with_drift(80, 0.0, Timeframe::H1));
        let raw = EmaTrendRider::new().detect(&ctx).await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn short_history_stays_silent() {
        let ctx = DetectContext::new(frame_with_drift(10, 0.5, Timeframe::H1));
        let raw = EmaTrendRider::new().detect(&ctx).await.unwrap();
        assert!(raw.is_empty());
    }
}
