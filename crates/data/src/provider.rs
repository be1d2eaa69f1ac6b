//! Data provider contract and structured error types.
//!
//! Providers fetch raw OHLCV frames; the cache layer above this trait
//! owns validation, merging, and persistence. Providers never see the
//! cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confluence_core::{Frame, Timeframe};
use thiserror::Error;

/// Errors a data provider can surface to the cache.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 429-equivalent. The cache enters a cooldown and serves stale data.
    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Transport or upstream failure. Tolerated when a cached frame exists.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The provider cannot serve this interval directly.
    #[error("unsupported interval {0}")]
    UnsupportedInterval(Timeframe),
}

/// Trait for OHLCV data providers.
///
/// `start` bounds the request: `Some(t)` asks for bars strictly after `t`
/// (the incremental path); `None` asks for the provider's full default
/// history window.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Human-readable provider name, used in logs and cooldown keys.
    fn name(&self) -> &str;

    /// Fetches bars for `symbol` at `interval`.
    ///
    /// # Errors
    /// Returns [`ProviderError::RateLimited`] on 429-equivalent responses
    /// and [`ProviderError::Upstream`] on transport failures.
    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        start: Option<DateTime<Utc>>,
    ) -> Result<Frame, ProviderError>;
}
