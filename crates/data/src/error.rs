//! Cache error kinds.

use crate::provider::ProviderError;
use confluence_core::{FrameError, Timeframe};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no cached frame for {symbol} {timeframe}")]
    Miss { symbol: String, timeframe: Timeframe },
}
