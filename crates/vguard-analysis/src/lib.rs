//! Pixel-heuristic sensitivity analysis.
//!
//! Inspects sampled frames and produces a safety verdict. The heuristic is
//! deterministic on purpose: it measures the fraction of red-dominant pixels
//! per frame and flags the whole video as soon as any single frame exceeds
//! the ratio limit.

pub mod decoder;
pub mod error;
pub mod sensitivity;

pub use decoder::{FrameDecoder, FramePixels, ImageFrameDecoder};
pub use error::{AnalyzerError, AnalyzerResult};
pub use sensitivity::{
    AnalysisOutcome, FrameRef, SensitivityAnalyzer, FLAG_REASON, RED_RATIO_LIMIT, RED_THRESHOLD,
};
