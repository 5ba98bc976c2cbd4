//! Error types for the sensitivity analyzer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for analyzer operations.
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that can occur while reading or decoding sampled frames.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Failed to decode frame {path}: {message}")]
    FrameDecode { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame decode task aborted")]
    TaskAborted,
}

impl AnalyzerError {
    pub fn frame_decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FrameDecode {
            path: path.into(),
            message: message.into(),
        }
    }
}
