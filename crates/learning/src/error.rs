//! Persistence errors for the weight store and the ledger.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
