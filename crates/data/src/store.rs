//! Parquet-backed frame persistence.
//!
//! Layout under the cache root:
//! - `parquet/<SYMBOL>_<TF>.parquet` — snappy-compressed columnar frame
//! - `metadata/<SYMBOL>_<TF>.json` — row count, timestamp bounds, write time
//!
//! Writes are atomic: write to `.tmp`, rename into place.

use crate::error::CacheError;
use arrow::array::{Array, ArrayRef, Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone, Utc};
use confluence_core::{Frame, Timeframe};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Metadata sidecar written next to each parquet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub rows: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

/// Columnar store for one cache root directory.
pub struct ParquetFrameStore {
    root: PathBuf,
}

impl ParquetFrameStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn parquet_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.root
            .join("parquet")
            .join(format!("{symbol}_{timeframe}.parquet"))
    }

    fn meta_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.root
            .join("metadata")
            .join(format!("{symbol}_{timeframe}.json"))
    }

    /// Persists a frame and its metadata sidecar.
    ///
    /// # Errors
    /// Returns an error if the frame is empty or the write fails.
    pub fn write_frame(&self, frame: &Frame) -> Result<(), CacheError> {
        if frame.is_empty() {
            return Err(CacheError::Parquet("refusing to persist empty frame".into()));
        }

        let parquet_path = self.parquet_path(&frame.symbol, frame.timeframe);
        let meta_path = self.meta_path(&frame.symbol, frame.timeframe);
        for path in [&parquet_path, &meta_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new("open", DataType::Float64, false),
            Field::new("high", DataType::Float64, false),
            Field::new("low", DataType::Float64, false),
            Field::new("close", DataType::Float64, false),
            Field::new("volume", DataType::Float64, false),
        ]));

        let timestamps: Vec<i64> = frame
            .timestamps
            .iter()
            .map(DateTime::timestamp_millis)
            .collect();

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMillisecondArray::from(timestamps)) as ArrayRef,
                Arc::new(Float64Array::from(frame.open.clone())) as ArrayRef,
                Arc::new(Float64Array::from(frame.high.clone())) as ArrayRef,
                Arc::new(Float64Array::from(frame.low.clone())) as ArrayRef,
                Arc::new(Float64Array::from(frame.close.clone())) as ArrayRef,
                Arc::new(Float64Array::from(frame.volume.clone())) as ArrayRef,
            ],
        )
        .map_err(|e| CacheError::Parquet(e.to_string()))?;

        let tmp_path = parquet_path.with_extension("parquet.tmp");
        let file = File::create(&tmp_path)?;
        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .map_err(|e| CacheError::Parquet(e.to_string()))?;
        writer
            .write(&batch)
            .map_err(|e| CacheError::Parquet(e.to_string()))?;
        writer
            .close()
            .map_err(|e| CacheError::Parquet(e.to_string()))?;
        fs::rename(&tmp_path, &parquet_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CacheError::Io(e)
        })?;

        let meta = CacheMeta {
            symbol: frame.symbol.clone(),
            timeframe: frame.timeframe,
            rows: frame.len(),
            start: frame.timestamps[0],
            end: frame.timestamps[frame.len() - 1],
            cached_at: frame.fetched_at,
        };
        let meta_tmp = meta_path.with_extension("json.tmp");
        fs::write(&meta_tmp, serde_json::to_string_pretty(&meta)?)?;
        fs::rename(&meta_tmp, &meta_path).map_err(|e| {
            let _ = fs::remove_file(&meta_tmp);
            CacheError::Io(e)
        })?;

        Ok(())
    }

    /// Loads the persisted frame for `(symbol, timeframe)`, if any.
    ///
    /// # Errors
    /// Returns [`CacheError::Miss`] when nothing is persisted, and a
    /// parquet error when the file cannot be decoded.
    pub fn read_frame(&self, symbol: &str, timeframe: Timeframe) -> Result<Frame, CacheError> {
        let parquet_path = self.parquet_path(symbol, timeframe);
        if !parquet_path.exists() {
            return Err(CacheError::Miss {
                symbol: symbol.to_string(),
                timeframe,
            });
        }

        let file = File::open(&parquet_path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| CacheError::Parquet(e.to_string()))?
            .build()
            .map_err(|e| CacheError::Parquet(e.to_string()))?;

        let mut timestamps = Vec::new();
        let mut columns: [Vec<f64>; 5] = Default::default();

        for batch in reader {
            let batch = batch.map_err(|e| CacheError::Parquet(e.to_string()))?;

            let ts = batch
                .column_by_name("timestamp")
                .and_then(|c| c.as_any().downcast_ref::<TimestampMillisecondArray>())
                .ok_or_else(|| CacheError::Parquet("missing column 'timestamp'".into()))?;
            for i in 0..ts.len() {
                let millis = ts.value(i);
                let dt = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| CacheError::Parquet(format!("bad timestamp {millis}")))?;
                timestamps.push(dt);
            }

            for (slot, name) in columns.iter_mut().zip(PRICE_COLUMNS) {
                let array = batch
                    .column_by_name(name)
                    .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
                    .ok_or_else(|| CacheError::Parquet(format!("missing column '{name}'")))?;
                slot.extend(array.values().iter().copied());
            }
        }

        let meta = self.read_meta(symbol, timeframe);
        let [open, high, low, close, volume] = columns;
        Ok(Frame {
            symbol: symbol.to_string(),
            timeframe,
            timestamps,
            open,
            high,
            low,
            close,
            volume,
            fetched_at: meta.map_or_else(Utc::now, |m| m.cached_at),
            served_stale: false,
        })
    }

    /// Reads the metadata sidecar, if present and parseable.
    #[must_use]
    pub fn read_meta(&self, symbol: &str, timeframe: Timeframe) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol, timeframe)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Returns true when a frame is persisted for the key.
    #[must_use]
    pub fn contains(&self, symbol: &str, timeframe: Timeframe) -> bool {
        self.parquet_path(symbol, timeframe).exists()
    }
}
