//! The specialist contract.

use crate::signal::RawSignals;
use async_trait::async_trait;
use confluence_core::{Frame, StrategyCategory, Timeframe, TrendRegime};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identity and declared preferences of one specialist.
#[derive(Debug, Clone)]
pub struct SpecialistDescriptor {
    pub agent_id: String,
    pub strategy_name: String,
    pub category: StrategyCategory,
    /// Regimes this strategy declares itself suited to. Consulted by
    /// the regime-consistency validator.
    pub ideal_regimes: Vec<TrendRegime>,
}

impl SpecialistDescriptor {
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        strategy_name: impl Into<String>,
        category: StrategyCategory,
        ideal_regimes: Vec<TrendRegime>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            strategy_name: strategy_name.into(),
            category,
            ideal_regimes,
        }
    }
}

/// Frames handed to every detector in one fan-out.
#[derive(Debug, Clone)]
pub struct DetectContext {
    pub frame: Arc<Frame>,
    htf: BTreeMap<Timeframe, Arc<Frame>>,
}

impl DetectContext {
    #[must_use]
    pub fn new(frame: Arc<Frame>) -> Self {
        Self {
            frame,
            htf: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_htf(mut self, frame: Arc<Frame>) -> Self {
        self.htf.insert(frame.timeframe, frame);
        self
    }

    /// Higher-timeframe frame, if one was fetched for `timeframe`.
    #[must_use]
    pub fn htf(&self, timeframe: Timeframe) -> Option<&Frame> {
        self.htf.get(&timeframe).map(Arc::as_ref)
    }

    /// All higher-timeframe frames, coarsest last.
    pub fn htf_frames(&self) -> impl Iterator<Item = &Frame> {
        self.htf.values().map(Arc::as_ref)
    }
}

/// A strategy component emitting candidate signals.
///
/// Detection must be a pure function of the context frames; failures
/// are isolated by the registry and never fail the pipeline.
#[async_trait]
pub trait Specialist: Send + Sync {
    fn descriptor(&self) -> &SpecialistDescriptor;

    async fn detect(&self, ctx: &DetectContext) -> anyhow::Result<RawSignals>;
}
