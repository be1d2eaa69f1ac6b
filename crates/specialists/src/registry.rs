//! Specialist registry and bounded-parallel fan-out.

use crate::normalize::normalize;
use crate::specialist::{DetectContext, Specialist};
use confluence_core::Candidate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Holds the registered specialists and runs them against a frame.
#[derive(Default)]
pub struct SpecialistRegistry {
    specialists: Vec<Arc<dyn Specialist>>,
}

impl SpecialistRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, specialist: Arc<dyn Specialist>) {
        tracing::info!(
            agent_id = %specialist.descriptor().agent_id,
            strategy = %specialist.descriptor().strategy_name,
            "registered specialist"
        );
        self.specialists.push(specialist);
    }

    /// Removes a specialist by agent id. Returns false when absent.
    pub fn remove(&mut self, agent_id: &str) -> bool {
        let before = self.specialists.len();
        self.specialists
            .retain(|s| s.descriptor().agent_id != agent_id);
        before != self.specialists.len()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.specialists
            .iter()
            .map(|s| s.descriptor().strategy_name.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specialists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specialists.is_empty()
    }

    /// Runs every specialist against the context under a bounded worker
    /// pool and a per-detector timeout.
    ///
    /// Detector errors, timeouts, and panics are isolated: the failing
    /// detector contributes no candidates and the run continues. The
    /// result is canonically sorted by `(strategy_name, direction)` so
    /// registration order never leaks into fusion.
    pub async fn fan_out(
        &self,
        ctx: &DetectContext,
        parallelism: usize,
        detector_timeout: Duration,
    ) -> Vec<Candidate> {
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let mut tasks = JoinSet::new();

        for specialist in &self.specialists {
            let specialist = Arc::clone(specialist);
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Closed only if the registry is dropped mid-run.
                let Ok(_permit) = semaphore.acquire().await else {
                    return Vec::new();
                };
                let descriptor = specialist.descriptor().clone();
                match tokio::time::timeout(detector_timeout, specialist.detect(&ctx)).await {
                    Ok(Ok(raw)) => normalize(&descriptor, raw),
                    Ok(Err(error)) => {
                        tracing::warn!(
                            agent_id = %descriptor.agent_id,
                            %error,
                            "detector failed, contributing no candidates"
                        );
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(
                            agent_id = %descriptor.agent_id,
                            timeout_ms = detector_timeout.as_millis() as u64,
                            "detector timed out, contributing no candidates"
                        );
                        Vec::new()
                    }
                }
            });
        }

        let mut candidates = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(batch) => candidates.extend(batch),
                Err(error) => {
                    tracing::warn!(%error, "detector task panicked, contributing no candidates");
                }
            }
        }

        candidates.sort_by(|a, b| {
            (a.strategy_name.as_str(), a.direction).cmp(&(b.strategy_name.as_str(), b.direction))
        });
        candidates
    }
}
