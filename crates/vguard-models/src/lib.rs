//! Shared data models for the VideoGuard backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video records and processing status
//! - Sensitivity analysis results
//! - WebSocket event schemas

pub mod analysis;
pub mod video;
pub mod ws;

// Re-export common types
pub use analysis::{AnalysisResults, FrameScore, OverallVerdict, SensitivityVerdict};
pub use video::{TenantId, VideoId, VideoRecord, VideoStatus};
pub use ws::{ProcessingStep, WsEvent};
