//! Historical OHLCV cache.
//!
//! Serves validated frames to the pipeline. Fresh frames are returned
//! from memory or disk; stale frames trigger an incremental fetch that
//! requests only bars after the cached tail, merges keep-last, sorts,
//! and re-validates. Upstream failures degrade to the cached frame;
//! rate limits open a cooldown during which stale data is served with
//! the `served_stale` flag set.

use crate::cooldown::Cooldown;
use crate::error::CacheError;
use crate::provider::{DataProvider, ProviderError};
use crate::store::ParquetFrameStore;
use chrono::{Duration, Utc};
use confluence_core::{Frame, Timeframe};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

type CacheKey = (String, Timeframe);

/// Incremental, parquet-backed frame cache.
pub struct HistoricalCache {
    provider: Arc<dyn DataProvider>,
    store: ParquetFrameStore,
    max_age: Duration,
    frames: RwLock<HashMap<CacheKey, Arc<Frame>>>,
    /// Serializes writes per `(symbol, timeframe)` key.
    key_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    cooldown: std::sync::Mutex<Cooldown>,
}

impl HistoricalCache {
    #[must_use]
    pub fn new(
        provider: Arc<dyn DataProvider>,
        cache_root: impl AsRef<Path>,
        max_age_hours: u64,
    ) -> Self {
        Self {
            provider,
            store: ParquetFrameStore::new(cache_root.as_ref()),
            max_age: Duration::hours(max_age_hours as i64),
            frames: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
            cooldown: std::sync::Mutex::new(Cooldown::new()),
        }
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    /// Returns the cached frame when it is younger than `max_age`.
    ///
    /// Falls back to the persisted store when the in-memory layer has
    /// not yet seen the key.
    pub async fn get(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        max_age: Duration,
    ) -> Option<Arc<Frame>> {
        let frame = self.peek(symbol, timeframe).await?;
        (frame.age(Utc::now()) <= max_age).then_some(frame)
    }

    /// Returns the cached frame regardless of age.
    pub async fn peek(&self, symbol: &str, timeframe: Timeframe) -> Option<Arc<Frame>> {
        let key = (symbol.to_string(), timeframe);
        if let Some(frame) = self.frames.read().await.get(&key) {
            return Some(frame.clone());
        }

        let frame = Arc::new(self.store.read_frame(symbol, timeframe).ok()?);
        self.frames.write().await.insert(key, frame.clone());
        Some(frame)
    }

    /// Validates and persists a frame, replacing any cached one.
    ///
    /// # Errors
    /// Returns a [`confluence_core::FrameError`] wrapped in
    /// [`CacheError::Frame`] on validation failure.
    pub async fn put(&self, frame: Frame) -> Result<Arc<Frame>, CacheError> {
        let key = (frame.symbol.clone(), frame.timeframe);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;
        self.put_locked(key, frame).await
    }

    async fn put_locked(&self, key: CacheKey, frame: Frame) -> Result<Arc<Frame>, CacheError> {
        frame.validate()?;
        self.store.write_frame(&frame)?;
        let frame = Arc::new(frame);
        self.frames.write().await.insert(key, frame.clone());
        Ok(frame)
    }

    /// Returns a fresh frame, fetching incrementally when the cache is
    /// stale or cold.
    ///
    /// # Errors
    /// Propagates provider errors only when no cached frame exists to
    /// degrade to; validation rejections always propagate.
    pub async fn fetch_or_refresh(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<Frame>, CacheError> {
        let key = (symbol.to_string(), timeframe);
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let cached = self.peek(symbol, timeframe).await;
        if let Some(frame) = &cached {
            if frame.age(Utc::now()) <= self.max_age {
                return Ok(frame.clone());
            }
        }

        if self.cooldown.lock().expect("cooldown lock").active(Instant::now()) {
            return match cached {
                Some(frame) => Ok(mark_stale(&frame)),
                None => Err(ProviderError::RateLimited {
                    retry_after_secs: 0,
                }
                .into()),
            };
        }

        let base = timeframe.provider_base();
        // For resampled timeframes, restart the fetch one base interval
        // before the last cached bucket so the partial bucket is rebuilt
        // in full; keep-last dedup replaces it on merge.
        let start = cached.as_ref().and_then(|frame| {
            let last = frame.last_timestamp()?;
            Some(if timeframe.needs_resample() {
                last - base.duration()
            } else {
                last
            })
        });

        let fetched = match self.provider.fetch(symbol, base, start).await {
            Ok(frame) => frame,
            Err(ProviderError::RateLimited { retry_after_secs }) => {
                let applied = self
                    .cooldown
                    .lock()
                    .expect("cooldown lock")
                    .register_rate_limit(Instant::now(), Some(retry_after_secs));
                tracing::warn!(
                    provider = %self.provider.name(),
                    backoff_secs = applied.as_secs(),
                    "Provider rate limited, entering cooldown"
                );
                return match cached {
                    Some(frame) => Ok(mark_stale(&frame)),
                    None => Err(ProviderError::RateLimited { retry_after_secs }.into()),
                };
            }
            Err(e) => {
                return match cached {
                    Some(frame) => {
                        tracing::warn!(
                            provider = %self.provider.name(),
                            error = %e,
                            "Provider fetch failed, serving cached frame"
                        );
                        Ok(frame.clone())
                    }
                    None => Err(e.into()),
                };
            }
        };
        self.cooldown.lock().expect("cooldown lock").reset();

        // Empty incremental result with a present cache: upstream had
        // nothing new (or failed quietly); serve the cache as-is.
        if fetched.is_empty() {
            return match cached {
                Some(frame) => Ok(frame.clone()),
                None => Err(CacheError::Miss {
                    symbol: symbol.to_string(),
                    timeframe,
                }),
            };
        }

        let incoming = if timeframe.needs_resample() {
            fetched.resample(timeframe)
        } else {
            fetched
        };

        let merged = match cached {
            Some(frame) => frame.merge_incremental(&incoming),
            None => incoming,
        };

        self.put_locked(key, merged).await
    }
}

fn mark_stale(frame: &Arc<Frame>) -> Arc<Frame> {
    let mut stale = Frame::clone(frame);
    stale.served_stale = true;
    Arc::new(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use confluence_core::FrameBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn start_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn make_h1_frame(offset_hours: i64, n: usize) -> Frame {
        let mut builder = FrameBuilder::new("EURUSD", Timeframe::H1);
        for i in 0..n {
            let base = 1.08 + (offset_hours + i as i64) as f64 * 0.0001;
            builder.push(
                start_ts() + Duration::hours(offset_hours + i as i64),
                base,
                base + 0.0005,
                base - 0.0005,
                base + 0.0002,
                1_000.0,
            );
        }
        builder.build()
    }

    /// Scripted provider: pops pre-programmed responses in order.
    struct ScriptedProvider {
        responses: std::sync::Mutex<Vec<Result<Frame, ProviderError>>>,
        calls: AtomicUsize,
        starts: std::sync::Mutex<Vec<Option<DateTime<Utc>>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<Frame, ProviderError>>) -> Self {
            Self {
                responses: std::sync::Mutex::new(responses),
                calls: AtomicUsize::new(0),
                starts: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(
            &self,
            _symbol: &str,
            _interval: Timeframe,
            start: Option<DateTime<Utc>>,
        ) -> Result<Frame, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.starts.lock().unwrap().push(start);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError::Upstream("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn make_cache(provider: ScriptedProvider, dir: &TempDir) -> HistoricalCache {
        HistoricalCache::new(Arc::new(provider), dir.path(), 24)
    }

    #[tokio::test]
    async fn cold_cache_fetches_full_history() {
        let dir = TempDir::new().unwrap();
        let cache = make_cache(ScriptedProvider::new(vec![Ok(make_h1_frame(0, 200))]), &dir);

        let frame = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();

        assert_eq!(frame.len(), 200);
        assert!(!frame.served_stale);
    }

    #[tokio::test]
    async fn fresh_cache_skips_provider() {
        let dir = TempDir::new().unwrap();
        let provider = ScriptedProvider::new(vec![Ok(make_h1_frame(0, 200))]);
        let cache = make_cache(provider, &dir);

        cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();
        let again = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();

        // Second call must be served from cache; the script would fail it.
        assert_eq!(again.len(), 200);
    }

    #[tokio::test]
    async fn incremental_merge_dedups_overlap() {
        let dir = TempDir::new().unwrap();
        // 200 cached bars ending at T; the provider then returns 3 bars
        // starting at T (one collision, keep last).
        let mut cached = make_h1_frame(0, 200);
        cached.fetched_at = Utc::now() - Duration::hours(48);
        let increment = make_h1_frame(199, 3);
        let cache = make_cache(ScriptedProvider::new(vec![Ok(increment)]), &dir);
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(cached),
        );

        let merged = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();

        assert_eq!(merged.len(), 202);
        for pair in merged.timestamps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[tokio::test]
    async fn empty_increment_serves_cache_as_is() {
        let dir = TempDir::new().unwrap();
        let mut cached = make_h1_frame(0, 200);
        cached.fetched_at = Utc::now() - Duration::hours(48);
        let empty = FrameBuilder::new("EURUSD", Timeframe::H1).build();
        let cache = make_cache(ScriptedProvider::new(vec![Ok(empty)]), &dir);
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(cached),
        );

        let frame = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();
        assert_eq!(frame.len(), 200);
        assert!(!frame.served_stale);
    }

    #[tokio::test]
    async fn upstream_failure_degrades_to_cache() {
        let dir = TempDir::new().unwrap();
        let mut cached = make_h1_frame(0, 200);
        cached.fetched_at = Utc::now() - Duration::hours(48);
        let cache = make_cache(
            ScriptedProvider::new(vec![Err(ProviderError::Upstream("boom".into()))]),
            &dir,
        );
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(cached),
        );

        let frame = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();
        assert_eq!(frame.len(), 200);
    }

    #[tokio::test]
    async fn rate_limit_serves_stale_and_opens_cooldown() {
        let dir = TempDir::new().unwrap();
        let mut cached = make_h1_frame(0, 200);
        cached.fetched_at = Utc::now() - Duration::hours(48);
        let provider = ScriptedProvider::new(vec![Err(ProviderError::RateLimited {
            retry_after_secs: 1,
        })]);
        let cache = make_cache(provider, &dir);
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(cached),
        );

        let first = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();
        assert!(first.served_stale);

        // Cooldown is open: the provider must not be called again.
        let second = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();
        assert!(second.served_stale);
    }

    #[tokio::test]
    async fn rate_limit_without_cache_propagates() {
        let dir = TempDir::new().unwrap();
        let cache = make_cache(
            ScriptedProvider::new(vec![Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            })]),
            &dir,
        );

        let result = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await;
        assert!(matches!(
            result,
            Err(CacheError::Provider(ProviderError::RateLimited { .. }))
        ));
    }

    #[tokio::test]
    async fn h4_is_fetched_at_h1_and_resampled() {
        let dir = TempDir::new().unwrap();
        // 400 H1 bars resample to 100 H4 bars.
        let cache = make_cache(ScriptedProvider::new(vec![Ok(make_h1_frame(0, 400))]), &dir);

        let frame = cache.fetch_or_refresh("EURUSD", Timeframe::H4).await.unwrap();

        assert_eq!(frame.timeframe, Timeframe::H4);
        assert_eq!(frame.len(), 100);
        assert!(frame.validate().is_ok());
    }

    #[tokio::test]
    async fn invalid_provider_frame_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut bad = make_h1_frame(0, 200);
        bad.close[10] = -1.0;
        let cache = make_cache(ScriptedProvider::new(vec![Ok(bad)]), &dir);

        let result = cache.fetch_or_refresh("EURUSD", Timeframe::H1).await;
        assert!(matches!(result, Err(CacheError::Frame(_))));
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = TempDir::new().unwrap();
        let cache = make_cache(ScriptedProvider::new(vec![]), &dir);
        let frame = make_h1_frame(0, 60);

        cache.put(frame.clone()).await.unwrap();
        let loaded = cache
            .get("EURUSD", Timeframe::H1, Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(loaded.timestamps, frame.timestamps);
        assert_eq!(loaded.close, frame.close);
    }

    #[tokio::test]
    async fn get_respects_max_age() {
        let dir = TempDir::new().unwrap();
        let cache = make_cache(ScriptedProvider::new(vec![]), &dir);
        let mut frame = make_h1_frame(0, 60);
        frame.fetched_at = Utc::now() - Duration::hours(10);
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(frame),
        );

        assert!(cache
            .get("EURUSD", Timeframe::H1, Duration::hours(1))
            .await
            .is_none());
        assert!(cache
            .get("EURUSD", Timeframe::H1, Duration::hours(24))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn incremental_fetch_requests_bars_after_tail() {
        let dir = TempDir::new().unwrap();
        let mut cached = make_h1_frame(0, 200);
        cached.fetched_at = Utc::now() - Duration::hours(48);
        let last = cached.last_timestamp().unwrap();

        let provider = Arc::new(ScriptedProvider::new(vec![Ok(make_h1_frame(199, 3))]));
        let cache = HistoricalCache::new(provider.clone(), dir.path(), 24);
        cache.frames.write().await.insert(
            ("EURUSD".to_string(), Timeframe::H1),
            Arc::new(cached),
        );

        cache.fetch_or_refresh("EURUSD", Timeframe::H1).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.starts.lock().unwrap()[0], Some(last));
    }
}
