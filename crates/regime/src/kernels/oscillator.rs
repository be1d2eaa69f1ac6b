//! RSI and Donchian channels.

/// Wilder RSI over `period` bars.
#[must_use]
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return out;
    }

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for i in 1..=period {
        let delta = close[i] - close[i - 1];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }
    let mut avg_gain = gain_sum / period as f64;
    let mut avg_loss = loss_sum / period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let delta = close[i] - close[i - 1];
        let (gain, loss) = if delta > 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Donchian channel bounds over the trailing `period` bars.
#[derive(Debug, Clone)]
pub struct DonchianChannel {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub mid: Vec<f64>,
}

/// Highest high and lowest low over `period` bars, excluding the
/// current bar so a breakout of the channel is observable on it.
#[must_use]
pub fn donchian(high: &[f64], low: &[f64], period: usize) -> DonchianChannel {
    let n = high.len();
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut mid = vec![f64::NAN; n];
    if period == 0 {
        return DonchianChannel { upper, lower, mid };
    }
    for i in period..n {
        let hh = high[i - period..i].iter().copied().fold(f64::MIN, f64::max);
        let ll = low[i - period..i].iter().copied().fold(f64::MAX, f64::min);
        upper[i] = hh;
        lower[i] = ll;
        mid[i] = (hh + ll) / 2.0;
    }
    DonchianChannel { upper, lower, mid }
}
