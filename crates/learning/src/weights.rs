//! Two-tier strategy weights with snapshot reads and atomic persistence.
//!
//! The voting engine reads a snapshot at the start of each fusion; the
//! adaptive learner is the single writer. An unavailable or corrupt
//! weights file falls back to uniform weights (empty tables), logged
//! once per store.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Weights for both tiers. Tier maps are independent and each sums to
/// 1.0 once the learner has run at least once; an empty map means
/// uniform weighting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightTables {
    #[serde(default)]
    pub specialist: BTreeMap<String, f64>,
    #[serde(default)]
    pub validator: BTreeMap<String, f64>,
}

impl WeightTables {
    /// Base weight for a specialist strategy. Unknown names fall back
    /// to a uniform share of the given population size.
    #[must_use]
    pub fn specialist_weight(&self, strategy: &str, population: usize) -> f64 {
        self.specialist
            .get(strategy)
            .copied()
            .unwrap_or_else(|| 1.0 / population.max(1) as f64)
    }
}

/// Read-mostly snapshot handle.
pub type WeightSnapshot = Arc<WeightTables>;

/// Single-writer, many-reader weight persistence.
pub struct WeightStore {
    path: PathBuf,
    current: RwLock<WeightSnapshot>,
}

impl WeightStore {
    /// Opens the store at `path` (conventionally
    /// `data/learning/optimized_weights.json`). A missing or corrupt
    /// file is not an error: the store starts uniform.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tables = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<WeightTables>(&content) {
                Ok(tables) => tables,
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "weights file unreadable, falling back to uniform weights"
                    );
                    WeightTables::default()
                }
            },
            Err(_) => {
                tracing::info!(
                    path = %path.display(),
                    "no persisted weights, starting uniform"
                );
                WeightTables::default()
            }
        };
        Self {
            path,
            current: RwLock::new(Arc::new(tables)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current tables. Cheap: clones an [`Arc`].
    #[must_use]
    pub fn snapshot(&self) -> WeightSnapshot {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_default()
    }

    /// Swaps in new tables and persists them atomically
    /// (write-to-temp + rename).
    ///
    /// # Errors
    /// Returns an error when the file cannot be written; the in-memory
    /// snapshot is only replaced after the write succeeds.
    pub fn replace(&self, tables: WeightTables) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&tables)?)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io(e)
        })?;

        if let Ok(mut guard) = self.current.write() {
            *guard = Arc::new(tables);
        }
        Ok(())
    }
}
