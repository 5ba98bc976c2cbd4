//! Error types for the metadata repository.

use thiserror::Error;
use vguard_models::VideoId;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from the video metadata repository.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Video not found: {0}")]
    NotFound(VideoId),

    /// The record exists but belongs to a different tenant. Surfaced as an
    /// authorization failure, not as not-found.
    #[error("Video {0} belongs to a different tenant")]
    TenantMismatch(VideoId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
