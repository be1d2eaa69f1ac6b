//! Bollinger and Keltner channels.

use super::moving::{ema, sma};
use super::volatility::atr;

/// A mid line with symmetric upper/lower bands. `width` is the
/// band spread normalized by the mid line.
#[derive(Debug, Clone)]
pub struct Bands {
    pub mid: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub width: Vec<f64>,
}

/// Bollinger bands: SMA mid line, `k` population standard deviations.
#[must_use]
pub fn bollinger(close: &[f64], period: usize, k: f64) -> Bands {
    let n = close.len();
    let mid = sma(close, period);
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut width = vec![f64::NAN; n];
    if period == 0 || n < period {
        return Bands {
            mid,
            upper,
            lower,
            width,
        };
    }
    for i in (period - 1)..n {
        let window = &close[i + 1 - period..=i];
        let mean = mid[i];
        let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let dev = var.sqrt();
        upper[i] = mean + k * dev;
        lower[i] = mean - k * dev;
        width[i] = if mean == 0.0 {
            f64::NAN
        } else {
            (upper[i] - lower[i]) / mean
        };
    }
    Bands {
        mid,
        upper,
        lower,
        width,
    }
}

/// Keltner channel: EMA mid line offset by `mult` ATRs.
#[must_use]
pub fn keltner(high: &[f64], low: &[f64], close: &[f64], period: usize, mult: f64) -> Bands {
    let n = close.len();
    let mid = ema(close, period);
    let ranges = atr(high, low, close, period);
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut width = vec![f64::NAN; n];
    for i in 0..n {
        if !mid[i].is_finite() || !ranges[i].is_finite() {
            continue;
        }
        upper[i] = mid[i] + mult * ranges[i];
        lower[i] = mid[i] - mult * ranges[i];
        width[i] = if mid[i] == 0.0 {
            f64::NAN
        } else {
            (upper[i] - lower[i]) / mid[i]
        };
    }
    Bands {
        mid,
        upper,
        lower,
        width,
    }
}
