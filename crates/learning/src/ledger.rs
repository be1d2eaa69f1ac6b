//! Append-only outcome ledger.
//!
//! One JSON line per resolved signal in `performance.json`, loaded
//! eagerly at startup. Appends are totally ordered by arrival; corrupt
//! lines are skipped with a warning rather than poisoning the load.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use confluence_core::OutcomeRecord;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct OutcomeLedger {
    path: PathBuf,
    records: Mutex<Vec<OutcomeRecord>>,
}

impl OutcomeLedger {
    /// Opens the ledger at `path` (conventionally
    /// `data/learning/performance.json`), loading every parseable line.
    ///
    /// # Errors
    /// Returns an error only when an existing file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Vec::new();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            for (index, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<OutcomeRecord>(line) {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        tracing::warn!(
                            path = %path.display(),
                            line = index + 1,
                            %error,
                            "skipping corrupt ledger line"
                        );
                    }
                }
            }
        }
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and returns the new ledger length.
    ///
    /// # Errors
    /// Returns an error when the line cannot be written.
    pub fn append(&self, record: OutcomeRecord) -> Result<usize, StoreError> {
        let line = serde_json::to_string(&record)?;

        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;

        records.push(record);
        Ok(records.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |r| r.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every record, in append order.
    #[must_use]
    pub fn records(&self) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Records with `timestamp >= since`.
    #[must_use]
    pub fn window(&self, since: DateTime<Utc>) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records in which `strategy` voted, as specialist or validator.
    #[must_use]
    pub fn involving(&self, strategy: &str) -> Vec<OutcomeRecord> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.involves(strategy))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
