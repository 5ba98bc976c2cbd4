//! Video processing pipeline.
//!
//! The orchestrator owns run deduplication and the checkpoint schedule, and
//! wires the frame sampler, sensitivity analyzer, media store, metadata
//! repository and event broadcaster into one detached run per video.

pub mod error;
pub mod orchestrator;
pub mod run_registry;

pub use error::{PipelineError, PipelineResult};
pub use orchestrator::{ProcessingOrchestrator, StartOutcome};
pub use run_registry::{RunGuard, RunRegistry};
