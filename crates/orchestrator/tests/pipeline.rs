//! End-to-end pipeline tests with a scripted provider and scripted
//! specialists.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use confluence_core::{
    AgentVote, ConfidenceLabel, EngineConfig, Frame, FrameBuilder, OutcomeRecord, SignalDirection,
    StrategyCategory, Timeframe, TradeOutcome, TrendRegime, ValidatorVote, VetoStatus,
};
use confluence_data::{DataProvider, ProviderError};
use confluence_orchestrator::{AnalysisRequest, OrchestratorBuilder, PipelineError};
use confluence_specialists::{
    DetectContext, RawSignal, RawSignals, Specialist, SpecialistDescriptor,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn start_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
}

/// Price shape the scripted provider serves.
#[derive(Clone, Copy)]
enum Fixture {
    /// Oscillates in a band; classifies as ranging.
    Ranging,
    /// Stairstep advance; classifies as a strong uptrend.
    Trending,
}

struct ScriptedProvider {
    fixture: Fixture,
    bars: usize,
}

impl ScriptedProvider {
    fn new(fixture: Fixture, bars: usize) -> Self {
        Self { fixture, bars }
    }

    fn close_at(&self, i: usize) -> f64 {
        match self.fixture {
            Fixture::Ranging => 100.0 + ((i % 10) as f64 - 5.0) * 0.3,
            Fixture::Trending => {
                let base = 100.0 + (i / 12) as f64 * 5.0;
                let pos = (i % 12) as f64;
                let ramp = if pos < 8.0 { pos } else { 7.0 - 0.75 * (pos - 7.0) };
                base + ramp
            }
        }
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        _start: Option<DateTime<Utc>>,
    ) -> Result<Frame, ProviderError> {
        let mut builder = FrameBuilder::new(symbol, interval);
        for i in 0..self.bars {
            let close = self.close_at(i);
            let open = close - 0.2;
            builder.push(
                start_ts() + ChronoDuration::hours(i as i64),
                open,
                close + 0.5,
                open - 0.5,
                close,
                1_000.0 + i as f64 * 5.0,
            );
        }
        Ok(builder.build())
    }
}

/// Serves a frame with one out-of-order timestamp; fails validation.
struct CorruptProvider;

#[async_trait]
impl DataProvider for CorruptProvider {
    fn name(&self) -> &str {
        "corrupt"
    }

    async fn fetch(
        &self,
        symbol: &str,
        interval: Timeframe,
        _start: Option<DateTime<Utc>>,
    ) -> Result<Frame, ProviderError> {
        let mut builder = FrameBuilder::new(symbol, interval);
        for i in 0..120 {
            let hours = if i == 60 { 10 } else { i };
            let close = 100.0 + (i % 10) as f64 * 0.3;
            builder.push(
                start_ts() + ChronoDuration::hours(hours),
                close - 0.2,
                close + 0.5,
                close - 0.7,
                close,
                1_000.0,
            );
        }
        Ok(builder.build())
    }
}

/// Always answers 429.
struct ThrottledProvider;

#[async_trait]
impl DataProvider for ThrottledProvider {
    fn name(&self) -> &str {
        "throttled"
    }

    async fn fetch(
        &self,
        _symbol: &str,
        _interval: Timeframe,
        _start: Option<DateTime<Utc>>,
    ) -> Result<Frame, ProviderError> {
        Err(ProviderError::RateLimited { retry_after_secs: 5 })
    }
}

/// Emits one fixed vote per invocation.
struct Voter {
    descriptor: SpecialistDescriptor,
    direction: &'static str,
    confidence: f64,
}

impl Voter {
    fn new(name: &str, category: StrategyCategory, direction: &'static str, confidence: f64) -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                format!("{name}_01"),
                name,
                category,
                Vec::new(),
            ),
            direction,
            confidence,
        }
    }
}

#[async_trait]
impl Specialist for Voter {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, _ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        Ok(RawSignals::Flat(vec![RawSignal::new(
            self.direction,
            self.confidence,
        )]))
    }
}

struct FailingDetector {
    descriptor: SpecialistDescriptor,
}

impl FailingDetector {
    fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "broken_01",
                "broken",
                StrategyCategory::Other,
                Vec::new(),
            ),
        }
    }
}

#[async_trait]
impl Specialist for FailingDetector {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, _ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        anyhow::bail!("indicator produced NaN")
    }
}

struct SlowDetector {
    descriptor: SpecialistDescriptor,
}

impl SlowDetector {
    fn new() -> Self {
        Self {
            descriptor: SpecialistDescriptor::new(
                "slow_01",
                "slow",
                StrategyCategory::Other,
                Vec::new(),
            ),
        }
    }
}

#[async_trait]
impl Specialist for SlowDetector {
    fn descriptor(&self) -> &SpecialistDescriptor {
        &self.descriptor
    }

    async fn detect(&self, _ctx: &DetectContext) -> anyhow::Result<RawSignals> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(RawSignals::none())
    }
}

fn test_config(dir: &TempDir) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.cache.data_dir = dir.path().to_path_buf();
    // No higher timeframes: one provider fetch per analysis.
    config.pipeline.htf_timeframes = Vec::new();
    config
}

fn builder(dir: &TempDir, fixture: Fixture, bars: usize) -> OrchestratorBuilder {
    OrchestratorBuilder::new(Arc::new(ScriptedProvider::new(fixture, bars)))
        .with_config(test_config(dir))
}

// ============================================
// Consensus and Tie Paths
// ============================================

#[tokio::test]
async fn unanimous_buy_reaches_consensus() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(Voter::new("alpha", StrategyCategory::Other, "bullish", 0.8)))
        .with_specialist(Arc::new(Voter::new("beta", StrategyCategory::Other, "bullish", 0.8)))
        .with_specialist(Arc::new(Voter::new("gamma", StrategyCategory::Other, "bullish", 0.8)))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Buy);
    // Uniform weights over three strategies: mass 0.8, reference K = 3.
    assert!((signal.confidence - 0.8 / 3.0).abs() < 1e-9);
    assert_eq!(signal.supporting_agents.len(), 3);
    assert!(signal.opposing_agents.is_empty());
    assert_eq!(signal.veto_status, VetoStatus::Clear);
    assert!(signal.regime.is_some());
    assert!(signal.signal_id.starts_with("EURUSD-H1-"));
}

#[tokio::test]
async fn split_vote_ties_to_neutral() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(Voter::new("a", StrategyCategory::Other, "bullish", 0.7)))
        .with_specialist(Arc::new(Voter::new("b", StrategyCategory::Other, "bullish", 0.7)))
        .with_specialist(Arc::new(Voter::new("c", StrategyCategory::Other, "bearish", 0.7)))
        .with_specialist(Arc::new(Voter::new("d", StrategyCategory::Other, "bearish", 0.7)))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.label, ConfidenceLabel::Low);
    assert!(signal.veto_reasons.contains(&"vote_tie".to_string()));
}

// ============================================
// Degradation Paths
// ============================================

#[tokio::test(start_paused = true)]
async fn deadline_degrades_to_neutral() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(SlowDetector::new()))
        .build()
        .unwrap();

    let request =
        AnalysisRequest::new("EURUSD", Timeframe::H1).with_deadline(Duration::from_secs(1));
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.veto_reasons, vec!["deadline_exceeded".to_string()]);
}

#[tokio::test]
async fn failing_detector_yields_no_candidates() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(FailingDetector::new()))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.veto_reasons, vec!["no_candidates".to_string()]);
    // Nothing happened that should move weights.
    assert!(orchestrator.weights().specialist.is_empty());
}

#[tokio::test]
async fn invalid_provider_frame_degrades_to_neutral() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = OrchestratorBuilder::new(Arc::new(CorruptProvider))
        .with_config(test_config(&dir))
        .with_specialist(Arc::new(Voter::new("alpha", StrategyCategory::Other, "bullish", 0.8)))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.veto_reasons, vec!["invalid_frame".to_string()]);
}

#[tokio::test]
async fn rate_limit_with_cold_cache_degrades_to_neutral() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = OrchestratorBuilder::new(Arc::new(ThrottledProvider))
        .with_config(test_config(&dir))
        .with_specialist(Arc::new(Voter::new("alpha", StrategyCategory::Other, "bullish", 0.8)))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.veto_reasons, vec!["provider_rate_limited".to_string()]);
}

#[tokio::test]
async fn universe_scan_keeps_symbols_with_data_trouble() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = OrchestratorBuilder::new(Arc::new(ThrottledProvider))
        .with_config(test_config(&dir))
        .build()
        .unwrap();

    let universe = vec!["EURUSD".to_string(), "GBPUSD".to_string()];
    let signals = orchestrator
        .analyze_universe(&universe, Timeframe::H1)
        .await
        .unwrap();

    // Neither symbol drops out of the scan; both come back NEUTRAL.
    assert_eq!(signals.len(), 2);
    for signal in &signals {
        assert_eq!(signal.decision, SignalDirection::Neutral);
        assert_eq!(signal.veto_reasons, vec!["provider_rate_limited".to_string()]);
    }
}

#[tokio::test]
async fn counter_trend_family_is_vetoed_in_strong_uptrend() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Trending, 248)
        .with_specialist(Arc::new(Voter::new(
            "chaser",
            StrategyCategory::TrendFollowing,
            "bearish",
            0.9,
        )))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    assert_eq!(signal.decision, SignalDirection::Neutral);
    assert_eq!(signal.veto_status, VetoStatus::AllVetoed);
    assert_eq!(signal.veto_reasons[0], "no_candidates_passed_validation");
    assert!(signal.veto_reasons.len() > 1);
}

// ============================================
// Entry Point Contracts
// ============================================

#[tokio::test]
async fn unknown_timeframe_is_rejected_up_front() {
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120).build().unwrap();

    let result = orchestrator.analyze_named("EURUSD", "H7").await;
    assert!(matches!(result, Err(PipelineError::Timeframe(_))));
}

#[tokio::test]
async fn empty_universe_is_rejected() {
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120).build().unwrap();

    let result = orchestrator.analyze_universe(&[], Timeframe::H1).await;
    assert!(matches!(result, Err(PipelineError::EmptyUniverse)));
}

#[tokio::test]
async fn universe_scan_emits_one_signal_per_symbol() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(Voter::new("alpha", StrategyCategory::Other, "bullish", 0.8)))
        .build()
        .unwrap();

    let universe = vec!["EURUSD".to_string(), "GBPUSD".to_string()];
    let signals = orchestrator
        .analyze_universe(&universe, Timeframe::H1)
        .await
        .unwrap();

    assert_eq!(signals.len(), 2);
    assert_eq!(signals[0].symbol, "EURUSD");
    assert_eq!(signals[1].symbol, "GBPUSD");
}

// ============================================
// Learning Loop
// ============================================

fn outcome(strategy: &str, outcome: TradeOutcome, profit: f64) -> OutcomeRecord {
    let at = Utc::now() - ChronoDuration::hours(1);
    OutcomeRecord {
        signal_id: format!("EURUSD-H1-{}", at.timestamp_millis()),
        timestamp: at,
        symbol: "EURUSD".to_string(),
        direction: SignalDirection::Buy,
        agent_votes: vec![AgentVote {
            agent_id: format!("{strategy}_01"),
            strategy_name: strategy.to_string(),
            direction: SignalDirection::Buy,
            confidence: 0.8,
        }],
        validator_votes: vec![ValidatorVote {
            name: "risk".to_string(),
            passed: true,
        }],
        outcome,
        profit_pips: profit,
    }
}

#[tokio::test]
async fn outcome_cadence_gates_the_learner() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.learning.min_samples = 4;
    config.learning.update_interval = 2;

    let orchestrator = OrchestratorBuilder::new(Arc::new(ScriptedProvider::new(
        Fixture::Ranging,
        120,
    )))
    .with_config(config)
    .build()
    .unwrap();

    for _ in 0..3 {
        let report = orchestrator
            .report_outcome(outcome("alpha", TradeOutcome::Win, 25.0))
            .unwrap();
        assert!(report.is_none());
    }

    // Fourth append reaches min_samples on the interval boundary.
    let report = orchestrator
        .report_outcome(outcome("alpha", TradeOutcome::Win, 25.0))
        .unwrap()
        .expect("learner due at sample four");
    assert_eq!(report.window_records, 4);

    // Single strategy normalizes to the whole tier.
    let weights = orchestrator.weights();
    assert!((weights.specialist["alpha"] - 1.0).abs() < 1e-9);

    // Fifth append is off-cadence.
    let report = orchestrator
        .report_outcome(outcome("alpha", TradeOutcome::Loss, -10.0))
        .unwrap();
    assert!(report.is_none());
    assert_eq!(orchestrator.outcomes_recorded(), 5);
}

#[tokio::test]
async fn registered_strategies_are_visible() {
    let dir = TempDir::new().unwrap();
    let orchestrator = builder(&dir, Fixture::Ranging, 120)
        .with_specialist(Arc::new(Voter::new("alpha", StrategyCategory::Other, "bullish", 0.8)))
        .with_specialist(Arc::new(Voter::new(
            "fader",
            StrategyCategory::MeanReversion,
            "bearish",
            0.6,
        )))
        .build()
        .unwrap();

    assert_eq!(orchestrator.strategies(), vec!["alpha", "fader"]);
}

// Regime-consistency declarations flow from descriptors into the
// gauntlet: a strategy declared for ranging markets must not survive a
// strong trend.
#[tokio::test]
async fn declared_regimes_gate_candidates() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let ranging_only = Voter {
        descriptor: SpecialistDescriptor::new(
            "range_01",
            "range_bound",
            StrategyCategory::Other,
            vec![TrendRegime::Ranging],
        ),
        direction: "bullish",
        confidence: 0.8,
    };
    let orchestrator = builder(&dir, Fixture::Trending, 248)
        .with_specialist(Arc::new(ranging_only))
        .build()
        .unwrap();

    let request = AnalysisRequest::new("EURUSD", Timeframe::H1);
    let signal = orchestrator.analyze(&request).await.unwrap();

    // Soft fail, not a veto: the candidate still loses its consistency
    // vote but passes the gauntlet on the other validators.
    assert_eq!(signal.decision, SignalDirection::Buy);
    assert_eq!(signal.veto_status, VetoStatus::Clear);
}
