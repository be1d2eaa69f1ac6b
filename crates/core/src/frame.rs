//! Columnar OHLCV frame.
//!
//! A frame is an ordered bar series with one `Vec` per column, strictly
//! monotonic timestamps at the nominal timeframe interval, and freshness
//! metadata set by the cache layer. Frames are immutable once handed to the
//! pipeline; merge and resample return new frames.

use crate::timeframe::Timeframe;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Hard validation rejections for OHLCV frames.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    #[error("missing or truncated column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("non-positive or non-finite {column} at row {row}: {value}")]
    NonPositivePrice {
        column: &'static str,
        row: usize,
        value: f64,
    },

    #[error("high {high} below low {low} at row {row}")]
    HighBelowLow { row: usize, high: f64, low: f64 },

    #[error("high {high} below bar body at row {row}")]
    HighBelowBody { row: usize, high: f64 },

    #[error("low {low} above bar body at row {row}")]
    LowAboveBody { row: usize, low: f64 },

    #[error("timestamps not strictly increasing at row {row}")]
    NonMonotonicTimestamps { row: usize },

    #[error("insufficient bars: got {got}, need {required}")]
    InsufficientBars { required: usize, got: usize },
}

/// One bar, read out of a frame by row index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Column-oriented OHLCV series for one `(symbol, timeframe)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub timestamps: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    /// When the cache last refreshed this frame from the provider.
    pub fetched_at: DateTime<Utc>,
    /// Set when the cache served this frame during a provider cooldown.
    #[serde(default)]
    pub served_stale: bool,
}

impl Frame {
    /// Number of bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns true if the frame holds no bars.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Reads one bar by row index.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<Bar> {
        if i >= self.len() {
            return None;
        }
        Some(Bar {
            timestamp: self.timestamps[i],
            open: self.open[i],
            high: self.high[i],
            low: self.low[i],
            close: self.close[i],
            volume: self.volume[i],
        })
    }

    /// Iterates bars in timestamp order.
    pub fn bars(&self) -> impl Iterator<Item = Bar> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Timestamp of the most recent bar.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Close of the most recent bar.
    #[must_use]
    pub fn last_close(&self) -> Option<f64> {
        self.close.last().copied()
    }

    /// Returns a new frame holding the last `n` bars.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let skip = self.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            timestamps: self.timestamps[skip..].to_vec(),
            open: self.open[skip..].to_vec(),
            high: self.high[skip..].to_vec(),
            low: self.low[skip..].to_vec(),
            close: self.close[skip..].to_vec(),
            volume: self.volume[skip..].to_vec(),
            fetched_at: self.fetched_at,
            served_stale: self.served_stale,
        }
    }

    /// Validates the frame against the hard rejection rules.
    ///
    /// Checks, in order: column lengths, price positivity/finiteness,
    /// bar geometry (`low <= body <= high`), strictly increasing
    /// timestamps, and the per-timeframe minimum bar count.
    ///
    /// # Errors
    /// Returns the first [`FrameError`] encountered.
    pub fn validate(&self) -> Result<(), FrameError> {
        let n = self.timestamps.len();
        for (column, values) in [
            ("open", &self.open),
            ("high", &self.high),
            ("low", &self.low),
            ("close", &self.close),
            ("volume", &self.volume),
        ] {
            if values.len() != n {
                return Err(FrameError::MissingColumn { column });
            }
        }

        for row in 0..n {
            for (column, values) in [
                ("open", &self.open),
                ("high", &self.high),
                ("low", &self.low),
                ("close", &self.close),
            ] {
                let value = values[row];
                if !(value.is_finite() && value > 0.0) {
                    return Err(FrameError::NonPositivePrice { column, row, value });
                }
            }
            let volume = self.volume[row];
            if !(volume.is_finite() && volume >= 0.0) {
                return Err(FrameError::NonPositivePrice {
                    column: "volume",
                    row,
                    value: volume,
                });
            }

            let (open, high, low, close) =
                (self.open[row], self.high[row], self.low[row], self.close[row]);
            if high < low {
                return Err(FrameError::HighBelowLow { row, high, low });
            }
            if high < open.max(close) {
                return Err(FrameError::HighBelowBody { row, high });
            }
            if low > open.min(close) {
                return Err(FrameError::LowAboveBody { row, low });
            }
        }

        for row in 1..n {
            if self.timestamps[row] <= self.timestamps[row - 1] {
                return Err(FrameError::NonMonotonicTimestamps { row });
            }
        }

        let required = self.timeframe.min_bars();
        if n < required {
            return Err(FrameError::InsufficientBars { required, got: n });
        }

        Ok(())
    }

    /// Merges an incremental fetch into this frame.
    ///
    /// Rows from both frames are keyed by timestamp; on collision the row
    /// from `newer` wins. The result is sorted and strictly monotonic.
    #[must_use]
    pub fn merge_incremental(&self, newer: &Frame) -> Frame {
        let mut rows: BTreeMap<DateTime<Utc>, (f64, f64, f64, f64, f64)> = BTreeMap::new();
        for bar in self.bars().chain(newer.bars()) {
            rows.insert(
                bar.timestamp,
                (bar.open, bar.high, bar.low, bar.close, bar.volume),
            );
        }

        let mut merged = FrameBuilder::new(&self.symbol, self.timeframe);
        for (ts, (open, high, low, close, volume)) in rows {
            merged.push(ts, open, high, low, close, volume);
        }
        let mut frame = merged.build();
        frame.fetched_at = newer.fetched_at.max(self.fetched_at);
        frame
    }

    /// Resamples to a coarser timeframe.
    ///
    /// Aggregation: open = first, high = max, low = min, close = last,
    /// volume = sum. Buckets are epoch-aligned for fixed intervals and
    /// calendar-aligned for MN1.
    #[must_use]
    pub fn resample(&self, target: Timeframe) -> Frame {
        let mut buckets: BTreeMap<DateTime<Utc>, (f64, f64, f64, f64, f64)> = BTreeMap::new();

        for bar in self.bars() {
            let key = bucket_start(bar.timestamp, target);
            buckets
                .entry(key)
                .and_modify(|(_, high, low, close, volume)| {
                    *high = high.max(bar.high);
                    *low = low.min(bar.low);
                    *close = bar.close;
                    *volume += bar.volume;
                })
                .or_insert((bar.open, bar.high, bar.low, bar.close, bar.volume));
        }

        let mut builder = FrameBuilder::new(&self.symbol, target);
        for (ts, (open, high, low, close, volume)) in buckets {
            builder.push(ts, open, high, low, close, volume);
        }
        let mut frame = builder.build();
        frame.fetched_at = self.fetched_at;
        frame.served_stale = self.served_stale;
        frame
    }

    /// Age of the frame relative to `now`.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

/// Start of the resample bucket containing `ts`.
fn bucket_start(ts: DateTime<Utc>, target: Timeframe) -> DateTime<Utc> {
    match target {
        Timeframe::Mn1 => Utc
            .with_ymd_and_hms(ts.year(), ts.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(ts),
        _ => {
            let step = target.duration().num_seconds();
            let secs = ts.timestamp();
            let aligned = secs - secs.rem_euclid(step);
            Utc.timestamp_opt(aligned, 0).single().unwrap_or(ts)
        }
    }
}

/// Row-wise accumulator for providers and tests.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    symbol: String,
    timeframe: Timeframe,
    timestamps: Vec<DateTime<Utc>>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl FrameBuilder {
    #[must_use]
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            timestamps: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
        }
    }

    /// Appends one bar.
    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> &mut Self {
        self.timestamps.push(timestamp);
        self.open.push(open);
        self.high.push(high);
        self.low.push(low);
        self.close.push(close);
        self.volume.push(volume);
        self
    }

    /// Number of bars accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    #[must_use]
    pub fn build(self) -> Frame {
        Frame {
            symbol: self.symbol,
            timeframe: self.timeframe,
            timestamps: self.timestamps,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            fetched_at: Utc::now(),
            served_stale: false,
        }
    }
}
