//! Wilder's directional movement system.

use super::volatility::{true_range, wilder_smooth};

/// ADX with its directional components. All three series carry the
/// kernel-wide NaN warmup; ADX warms up last (`2 * period - 1` bars).
#[derive(Debug, Clone)]
pub struct DirectionalIndex {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

/// Computes +DI, -DI, and ADX over `period` bars.
#[must_use]
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> DirectionalIndex {
    let n = high.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let tr = true_range(high, low, close);
    let smoothed_tr = wilder_smooth(&tr, period);
    let smoothed_plus = wilder_smooth(&plus_dm, period);
    let smoothed_minus = wilder_smooth(&minus_dm, period);

    let mut plus_di = vec![f64::NAN; n];
    let mut minus_di = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        let str_ = smoothed_tr[i];
        if !str_.is_finite() || str_ == 0.0 {
            continue;
        }
        let pdi = 100.0 * smoothed_plus[i] / str_;
        let mdi = 100.0 * smoothed_minus[i] / str_;
        plus_di[i] = pdi;
        minus_di[i] = mdi;
        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }

    // Smooth DX over its valid region only, then re-pad the warmup.
    let first_valid = dx.iter().position(|v| v.is_finite());
    let mut adx = vec![f64::NAN; n];
    if let Some(offset) = first_valid {
        let smoothed = wilder_smooth(&dx[offset..], period);
        for (i, v) in smoothed.into_iter().enumerate() {
            adx[offset + i] = v;
        }
    }

    DirectionalIndex {
        adx,
        plus_di,
        minus_di,
    }
}
