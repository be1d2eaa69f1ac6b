//! Swing-pivot structure and volume trend.

use confluence_core::StructureTag;

/// Confirmed swing pivots: indices paired with the pivot price.
#[derive(Debug, Clone, Default)]
pub struct SwingPoints {
    pub highs: Vec<(usize, f64)>,
    pub lows: Vec<(usize, f64)>,
}

/// Finds swing pivots with `k` confirming bars on each side.
#[must_use]
pub fn swing_points(high: &[f64], low: &[f64], k: usize) -> SwingPoints {
    let n = high.len();
    let mut points = SwingPoints::default();
    if k == 0 || n < 2 * k + 1 {
        return points;
    }
    for i in k..n - k {
        let is_high = (1..=k).all(|j| high[i] > high[i - j] && high[i] >= high[i + j]);
        if is_high {
            points.highs.push((i, high[i]));
        }
        let is_low = (1..=k).all(|j| low[i] < low[i - j] && low[i] <= low[i + j]);
        if is_low {
            points.lows.push((i, low[i]));
        }
    }
    points
}

/// Tags the recent swing structure from the last two confirmed pivots
/// on each side. Anything short of a clean higher-high/higher-low or
/// lower-high/lower-low sequence is [`StructureTag::Ranging`].
#[must_use]
pub fn classify_structure(high: &[f64], low: &[f64], k: usize) -> StructureTag {
    let points = swing_points(high, low, k);
    let (Some(&[(_, h1), (_, h2)]), Some(&[(_, l1), (_, l2)])) = (
        points.highs.last_chunk::<2>(),
        points.lows.last_chunk::<2>(),
    ) else {
        return StructureTag::Ranging;
    };

    if h2 > h1 && l2 > l1 {
        StructureTag::HhHl
    } else if h2 < h1 && l2 < l1 {
        StructureTag::LhLl
    } else {
        StructureTag::Ranging
    }
}

/// Least-squares slope of the trailing `window` volumes, per bar.
/// Positive means volume is building.
#[must_use]
pub fn volume_slope(volume: &[f64], window: usize) -> Option<f64> {
    if window < 2 || volume.len() < window {
        return None;
    }
    let tail = &volume[volume.len() - window..];
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
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}
