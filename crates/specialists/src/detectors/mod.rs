//! Reference detectors, one per strategy family the validators and
//! the regime multiplier treat specially.

mod donchian_breakout;
mod ema_trend;
mod pulse_scalper;
mod rsi_fade;

pub use donchian_breakout::DonchianBreakoutDetector;
pub use ema_trend::EmaTrendRider;
pub use pulse_scalper::PulseScalper;
pub use rsi_fade::RsiFadeDetector;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Price-to-decimal conversion shared by the detectors.
pub(crate) fn dec(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
}
