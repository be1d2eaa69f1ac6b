//! Per-provider rate-limit cooldown.
//!
//! Exponential backoff: 30 s base, doubling on each consecutive
//! rate-limit, capped at 600 s. While a cooldown is active the cache
//! serves stale frames instead of hitting the provider.

use std::time::{Duration, Instant};

const BASE_BACKOFF_SECS: u64 = 30;
const MAX_BACKOFF_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Cooldown {
    until: Option<Instant>,
    next_backoff_secs: u64,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new()
    }
}

impl Cooldown {
    #[must_use]
    pub fn new() -> Self {
        Self {
            until: None,
            next_backoff_secs: BASE_BACKOFF_SECS,
        }
    }

    /// Returns true while the cooldown window is open.
    #[must_use]
    pub fn active(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Registers a rate-limit response and returns the applied backoff.
    ///
    /// The provider's own `retry_after` hint is honored when it exceeds
    /// the escalating backoff.
    pub fn register_rate_limit(&mut self, now: Instant, retry_after_secs: Option<u64>) -> Duration {
        let backoff_secs = retry_after_secs
            .unwrap_or(0)
            .max(self.next_backoff_secs)
            .min(MAX_BACKOFF_SECS);
        self.until = Some(now + Duration::from_secs(backoff_secs));
        self.next_backoff_secs = (self.next_backoff_secs * 2).min(MAX_BACKOFF_SECS);
        Duration::from_secs(backoff_secs)
    }

    /// Resets the escalation after a successful fetch.
    pub fn reset(&mut self) {
        self.until = None;
        self.next_backoff_secs = BASE_BACKOFF_SECS;
    }
}
