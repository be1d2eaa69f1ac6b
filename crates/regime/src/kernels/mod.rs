//! Indicator kernels over plain `f64` slices.
//!
//! Every kernel returns a series the same length as its input, with
//! `NaN` in the warmup region. Callers pick the values they need with
//! [`last_valid`] rather than trimming.

pub mod adx;
pub mod bands;
pub mod moving;
pub mod oscillator;
pub mod structure;
pub mod volatility;

pub use adx::{adx, DirectionalIndex};
pub use bands::{bollinger, keltner, Bands};
pub use moving::{ema, slope_degrees, sma, trailing_percentile};
pub use oscillator::{donchian, rsi, DonchianChannel};
pub use structure::{classify_structure, swing_points, volume_slope, SwingPoints};
pub use volatility::{atr, true_range, wilder_smooth};

/// Last non-NaN value of a series.
#[must_use]
pub fn last_valid(series: &[f64]) -> Option<f64> {
    series.iter().rev().copied().find(|v| v.is_finite())
}

/// Mean of the trailing `window` non-NaN values.
#[must_use]
pub fn trailing_mean(series: &[f64], window: usize) -> Option<f64> {
    let valid: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() || window == 0 {
        return None;
    }
    let tail = &valid[valid.len().saturating_sub(window)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}
