//! Pipeline error kinds.
//!
//! Only programmer errors reach the caller; upstream and classification
//! failures degrade inside the pipeline.

use confluence_core::UnknownTimeframe;
use confluence_data::CacheError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Timeframe(#[from] UnknownTimeframe),

    #[error("symbol universe is empty")]
    EmptyUniverse,

    #[error(transparent)]
    Cache(#[from] CacheError),
}
