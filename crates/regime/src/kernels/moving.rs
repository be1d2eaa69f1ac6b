//! Moving averages, regression slope, and percentile rank.

/// Simple moving average. NaN until `period - 1`.
#[must_use]
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = sum / period as f64;
    }
    out
}

/// Exponential moving average seeded with the SMA of the first
/// `period` values.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = prev;
    for i in period..values.len() {
        prev = (values[i] - prev).mul_add(k, prev);
        out[i] = prev;
    }
    out
}

/// Least-squares slope over the trailing `window` values, expressed as
/// the arctangent (in degrees) of the total fractional change across
/// the window. Flat series produce 0, steep trends approach +-90.
#[must_use]
pub fn slope_degrees(values: &[f64], window: usize) -> Option<f64> {
    if window < 2 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    let n = window as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = tail.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in tail.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 || mean_y == 0.0 {
        return None;
    }
    let slope = num / den;
    Some(((slope * n) / mean_y).atan().to_degrees())
}

/// Percentile rank (0-100) of the last value within the trailing
/// `window` values, warmup excluded.
#[must_use]
pub fn trailing_percentile(series: &[f64], window: usize) -> Option<f64> {
    let valid: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() || window == 0 {
        return None;
    }
    let tail = &valid[valid.len().saturating_sub(window)..];
    let last = *tail.last()?;
    let below = tail.iter().filter(|&&v| v <= last).count();
    Some(below as f64 / tail.len() as f64 * 100.0)
}
