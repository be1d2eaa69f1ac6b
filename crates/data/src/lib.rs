//! Historical data layer: provider contract, parquet persistence, and
//! the incremental frame cache.

pub mod cache;
pub mod cooldown;
pub mod error;
pub mod provider;
pub mod store;

pub use cache::HistoricalCache;
pub use error::CacheError;
pub use provider::{DataProvider, ProviderError};
pub use store::{CacheMeta, ParquetFrameStore};
