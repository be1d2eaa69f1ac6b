//! Short-horizon momentum pulse.

use crate::signal::{RawSignal, RawSignals};
use crate::specialist::{DetectContext, Specialist, SpecialistDescriptor};
use async_trait::async_trait;
use confluence_core::{StrategyCategory, TrendRegime};
use confluence_regime::kernels::{ema, last_valid};

const MIN_BARS: usize = 15;
const FAST: usize = 5;
const SLOW: usize = 9;

/// Votes on two consecutive closes in the direction of the 5/9 EMA
/// cross. Deliberately emits no trade levels: a scalper's entry is
/// immediate, so the candidate is voting-only.
pub struct PulseScalper {
    descriptor: SpecialistDescriptor,
}

impl Default for PulseScalper {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseScalper {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "scalp_pulse_01",
                "pulse_scalper",
                StrategyCategory::Scalping,
                Vec::new(),
            ),
        }
    }
}

#[async_trait]
impl Specialist for PulseScalper {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        let frame = ctx.frame.as_ref();
        let n = frame.len();
        if n < MIN_BARS {
            return Ok(RawSignals::none());
        }

        let fast = last_valid(&ema(&frame.close, FAST)).unwrap_or(0.0);
        let slow = last_valid(&ema(&frame.close, SLOW)).unwrap_or(0.0);
        let c0 = frame.close[n - 3];
        let c1 = frame.close[n - 2];
        let c2 = frame.close[n - 1];

        let direction = if c2 > c1 && c1 > c0 && fast > slow {
            "bullish"
        } else if c2 < c1 && c1 < c0 && fast < slow {
            "bearish"
        } else {
            return Ok(RawSignals::none());
        };

        // Two pulses plus the cross; conviction grows with the spread.
        let spread = if slow > 0.0 { ((fast - slow).abs() / slow).min(0.01) } else { 0.0 };
        let confidence = 0.5 + 20.0 * spread;

        Ok(RawSignals::Flat(vec![RawSignal::new(direction, confidence)
            .with_evidence(format!("two-bar pulse with ema{FAST}/{SLOW} cross"))]))
    }
}
