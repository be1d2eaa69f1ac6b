//! Pipeline orchestration: one `analyze` call runs cache, regime
//! classification, specialist fan-out, validation, and fusion end to
//! end, and `report_outcome` closes the learning loop.

pub mod error;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::{AnalysisRequest, Orchestrator, OrchestratorBuilder};
