//! Shared data model for the confluence signal-fusion engine.
//!
//! Frames, candidates, regime snapshots, final signals, outcome records,
//! and the configuration tree. Every other crate in the workspace builds
//! on these types.

pub mod candidate;
pub mod config;
pub mod config_loader;
pub mod final_signal;
pub mod frame;
pub mod outcome;
pub mod regime;
pub mod timeframe;

pub use candidate::{Candidate, CandidateError, SignalDirection, StrategyCategory, Target};
pub use config::{
    CacheConfig, EngineConfig, FusionConfig, LearningConfig, PipelineConfig, ValidatorConfig,
};
pub use config_loader::ConfigLoader;
pub use final_signal::{
    make_signal_id, ConfidenceLabel, ExecutionPlan, FinalSignal, ScaleOut, VetoStatus,
};
pub use frame::{Bar, Frame, FrameBuilder, FrameError};
pub use outcome::{AgentVote, OutcomeRecord, TradeOutcome, ValidatorVote};
pub use regime::{
    AlignmentTier, DirectionalBias, MarketPhase, RegimeIndicators, RegimeSnapshot, StructureTag,
    SubClassification, TrendRegime, TrendStrength, VolatilityLevel,
};
pub use timeframe::{Timeframe, UnknownTimeframe};
