//! Error types for the processing pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors from a processing run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source file missing: {0}")]
    SourceMissing(PathBuf),

    #[error("Media error: {0}")]
    Media(#[from] vguard_media::MediaError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] vguard_analysis::AnalyzerError),

    #[error("Repository error: {0}")]
    Repo(#[from] vguard_repo::RepoError),

    #[error("Storage error: {0}")]
    Storage(#[from] vguard_store::StorageError),
}
