//! The analysis pipeline.
//!
//! One `analyze` call runs the full sequence: fetch frames, classify
//! the regime, fan specialists out, audit every candidate, fuse the
//! survivors, and emit one final signal. Upstream trouble degrades to
//! a NEUTRAL signal with a reason; only programmer errors propagate.

use crate::error::PipelineError;
use chrono::Utc;
use confluence_core::{EngineConfig, FinalSignal, OutcomeRecord, Timeframe};
use confluence_data::{CacheError, DataProvider, HistoricalCache, ProviderError};
use confluence_fusion::VotingEngine;
use confluence_learning::{
    AdaptiveLearner, OutcomeLedger, StoreError, UpdateReport, WeightSnapshot, WeightStore,
};
use confluence_regime::RegimeClassifier;
use confluence_specialists::{DetectContext, Specialist, SpecialistRegistry};
use confluence_validators::{
    EventCalendar, NewsValidator, RegimeConsistencyValidator, ValidationReport, ValidatorGauntlet,
};
use std::sync::Arc;
use std::time::Duration;

/// Default per-call budget when the request does not set one.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// One analysis invocation.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Overrides the configured higher timeframes when set.
    pub htf_timeframes: Option<Vec<Timeframe>>,
    /// Wall-clock budget for the whole call.
    pub deadline: Duration,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            htf_timeframes: None,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Builds a request from a wire-form timeframe name.
    ///
    /// # Errors
    /// Returns [`confluence_core::UnknownTimeframe`] for names outside
    /// the supported set.
    pub fn parse(
        symbol: impl Into<String>,
        timeframe: &str,
    ) -> Result<Self, confluence_core::UnknownTimeframe> {
        Ok(Self::new(symbol, timeframe.parse()?))
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_htf(mut self, timeframes: Vec<Timeframe>) -> Self {
        self.htf_timeframes = Some(timeframes);
        self
    }
}

/// Wires the pipeline components together.
pub struct OrchestratorBuilder {
    provider: Arc<dyn DataProvider>,
    config: EngineConfig,
    specialists: Vec<Arc<dyn Specialist>>,
    calendar: Option<Arc<dyn EventCalendar>>,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            config: EngineConfig::default(),
            specialists: Vec::new(),
            calendar: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_specialist(mut self, specialist: Arc<dyn Specialist>) -> Self {
        self.specialists.push(specialist);
        self
    }

    #[must_use]
    pub fn with_calendar(mut self, calendar: Arc<dyn EventCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Builds the orchestrator, opening the weight store and the
    /// outcome ledger under the configured data directory.
    ///
    /// # Errors
    /// Returns an error when an existing ledger file cannot be read.
    pub fn build(self) -> Result<Orchestrator, StoreError> {
        let data_dir = self.config.cache.data_dir.clone();
        let cache = HistoricalCache::new(
            self.provider,
            &data_dir,
            self.config.cache.max_age_hours,
        );

        let mut registry = SpecialistRegistry::new();
        let mut consistency = RegimeConsistencyValidator::new();
        for specialist in self.specialists {
            let descriptor = specialist.descriptor();
            consistency.declare(
                descriptor.strategy_name.clone(),
                descriptor.ideal_regimes.clone(),
            );
            registry.register(specialist);
        }

        let mut news = NewsValidator::new(self.config.validators.news_window_minutes);
        if let Some(calendar) = self.calendar {
            news = news.with_calendar(calendar);
        }
        let gauntlet = ValidatorGauntlet::from_config(&self.config.validators, consistency, news);

        let learning_dir = data_dir.join("learning");
        let weights = WeightStore::open(learning_dir.join("optimized_weights.json"));
        let ledger = OutcomeLedger::open(learning_dir.join("performance.json"))?;
        let learner = AdaptiveLearner::new(self.config.learning.clone());
        let engine = VotingEngine::new(self.config.fusion.clone());

        Ok(Orchestrator {
            cache,
            classifier: RegimeClassifier::new(),
            registry,
            gauntlet,
            engine,
            weights,
            ledger,
            learner,
            config: self.config,
        })
    }
}

/// The assembled pipeline. Reentrant across distinct
/// `(symbol, timeframe)` keys; learning state is shared.
pub struct Orchestrator {
    cache: HistoricalCache,
    classifier: RegimeClassifier,
    registry: SpecialistRegistry,
    gauntlet: ValidatorGauntlet,
    engine: VotingEngine,
    weights: WeightStore,
    ledger: OutcomeLedger,
    learner: AdaptiveLearner,
    config: EngineConfig,
}

impl Orchestrator {
    /// Runs one full analysis under the request deadline.
    ///
    /// Data-layer trouble never fails the call: a missing, invalid, or
    /// rate-limited frame degrades to a NEUTRAL signal carrying the
    /// reason.
    ///
    /// # Errors
    /// Reserved for programmer errors; see [`PipelineError`].
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<FinalSignal, PipelineError> {
        match tokio::time::timeout(request.deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    timeframe = %request.timeframe,
                    deadline_ms = request.deadline.as_millis() as u64,
                    "analysis deadline exceeded"
                );
                Ok(FinalSignal::neutral(
                    &request.symbol,
                    request.timeframe,
                    "deadline_exceeded",
                ))
            }
        }
    }

    /// Convenience entry point taking the timeframe in wire form.
    ///
    /// # Errors
    /// Rejects unknown timeframe names before any work is done.
    pub async fn analyze_named(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<FinalSignal, PipelineError> {
        let request = AnalysisRequest::parse(symbol, timeframe)?;
        self.analyze(&request).await
    }

    /// Analyzes every symbol in the universe at one timeframe. Every
    /// symbol yields a signal; per-symbol data trouble degrades to
    /// NEUTRAL inside `analyze`.
    ///
    /// # Errors
    /// Returns [`PipelineError::EmptyUniverse`] for an empty slice.
    pub async fn analyze_universe(
        &self,
        symbols: &[String],
        timeframe: Timeframe,
    ) -> Result<Vec<FinalSignal>, PipelineError> {
        if symbols.is_empty() {
            return Err(PipelineError::EmptyUniverse);
        }
        let mut signals = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let request = AnalysisRequest::new(symbol, timeframe);
            signals.push(self.analyze(&request).await?);
        }
        Ok(signals)
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<FinalSignal, PipelineError> {
        let frame = match self
            .cache
            .fetch_or_refresh(&request.symbol, request.timeframe)
            .await
        {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    timeframe = %request.timeframe,
                    %error,
                    "no usable frame, degrading to neutral"
                );
                return Ok(FinalSignal::neutral(
                    &request.symbol,
                    request.timeframe,
                    degradation_reason(&error),
                ));
            }
        };

        let htf_list = request
            .htf_timeframes
            .clone()
            .unwrap_or_else(|| self.config.pipeline.htf_timeframes.clone());
        let mut ctx = DetectContext::new(frame.clone());
        for timeframe in htf_list {
            if timeframe <= request.timeframe {
                continue;
            }
            match self.cache.fetch_or_refresh(&request.symbol, timeframe).await {
                Ok(htf) => ctx = ctx.with_htf(htf),
                Err(error) => {
                    tracing::warn!(
                        symbol = %request.symbol,
                        %timeframe,
                        %error,
                        "higher timeframe unavailable, continuing without it"
                    );
                }
            }
        }

        let regime = match self.classifier.classify(&frame) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    symbol = %request.symbol,
                    timeframe = %request.timeframe,
                    %error,
                    "regime classification unavailable, using neutral snapshot"
                );
                confluence_core::RegimeSnapshot::neutral()
            }
        };

        let candidates = self
            .registry
            .fan_out(
                &ctx,
                self.config.pipeline.parallelism,
                Duration::from_millis(self.config.pipeline.detector_timeout_ms),
            )
            .await;

        let slate: Vec<(confluence_core::Candidate, ValidationReport)> = candidates
            .into_iter()
            .map(|candidate| {
                let report = self.gauntlet.validate(&candidate, &frame, &regime);
                (candidate, report)
            })
            .collect();

        let signal = self.engine.fuse(
            &request.symbol,
            request.timeframe,
            &slate,
            &regime,
            &self.weights.snapshot(),
        );
        tracing::info!(
            signal_id = %signal.signal_id,
            decision = %signal.decision,
            confidence = signal.confidence,
            candidates = slate.len(),
            "analysis complete"
        );
        Ok(signal)
    }

    /// Records one resolved trade and runs the learner when the ledger
    /// hits the configured cadence.
    ///
    /// # Errors
    /// Returns an error when the ledger or the weight store cannot be
    /// written.
    pub fn report_outcome(
        &self,
        record: OutcomeRecord,
    ) -> Result<Option<UpdateReport>, StoreError> {
        let len = self.ledger.append(record)?;
        if !self.learner.due(len) {
            return Ok(None);
        }
        let report = self.learner.update(&self.ledger, &self.weights, Utc::now())?;
        Ok(Some(report))
    }

    /// Current weight tables.
    #[must_use]
    pub fn weights(&self) -> WeightSnapshot {
        self.weights.snapshot()
    }

    /// Outcomes recorded so far.
    #[must_use]
    pub fn outcomes_recorded(&self) -> usize {
        self.ledger.len()
    }

    /// Registered strategy names, in registration order.
    #[must_use]
    pub fn strategies(&self) -> Vec<String> {
        self.registry.names()
    }
}

/// Reason string a data-layer failure carries into the NEUTRAL signal.
fn degradation_reason(error: &CacheError) -> &'static str {
    match error {
        CacheError::Frame(_) => "invalid_frame",
        CacheError::Provider(ProviderError::RateLimited { .. }) => "provider_rate_limited",
        CacheError::Miss { .. } => "no_data",
        _ => "data_unavailable",
    }
}
