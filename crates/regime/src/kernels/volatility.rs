//! True range, ATR, and Wilder smoothing.

/// True range series. The first bar falls back to `high - low`.
#[must_use]
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let hl = high[i] - low[i];
        if i == 0 {
            out.push(hl);
        } else {
            let prev_close = close[i - 1];
            let hc = (high[i] - prev_close).abs();
            let lc = (low[i] - prev_close).abs();
            out.push(hl.max(hc).max(lc));
        }
    }
    out
}

/// Wilder's smoothing: seeded with the SMA of the first `period`
/// values, then `prev + (value - prev) / period`.
#[must_use]
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = prev;
    for i in period..values.len() {
        prev += (values[i] - prev) / period as f64;
        out[i] = prev;
    }
    out
}

/// Average true range over `period` bars.
#[must_use]
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(high, low, close), period)
}
