//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::analysis::AnalysisResults;

/// Unique identifier for an uploaded video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tenant isolation boundary. Every video and user belongs to exactly one
/// tenant; cross-tenant reads and writes are rejected at the repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Uploaded, analysis not yet started
    #[default]
    Uploaded,
    /// Analysis pipeline is running
    Processing,
    /// Analysis passed, content is safe
    Safe,
    /// Analysis flagged the content
    Flagged,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Safe => "safe",
            VideoStatus::Flagged => "flagged",
        }
    }

    /// Returns true once the pipeline reached a verdict.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Safe | VideoStatus::Flagged)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VideoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(VideoStatus::Uploaded),
            "processing" => Ok(VideoStatus::Processing),
            "safe" => Ok(VideoStatus::Safe),
            "flagged" => Ok(VideoStatus::Flagged),
            other => Err(format!("unknown video status '{other}'")),
        }
    }
}

/// Video metadata document stored in the metadata repository.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID
    pub video_id: VideoId,

    /// Tenant that owns this video
    pub tenant_id: TenantId,

    /// Uploading user ID
    pub uploader_id: String,

    /// Video title
    pub title: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Path of the stored source file
    pub file_path: String,

    /// Size of the source file in bytes
    pub file_size: u64,

    /// Container duration in seconds, null until probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Thumbnail path, null until extracted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,

    /// Processing status
    #[serde(default)]
    pub status: VideoStatus,

    /// Processing progress, 0-100, monotonically non-decreasing within a run
    #[serde(default)]
    pub processing_progress: u8,

    /// Reason the video was flagged, set only when status is flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,

    /// Structured analysis results, set when the pipeline finishes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResults>,

    /// View counter
    #[serde(default)]
    pub views: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Create a new video record at upload time.
    pub fn new(
        video_id: VideoId,
        tenant_id: TenantId,
        uploader_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        file_path: impl Into<String>,
        file_size: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            video_id,
            tenant_id,
            uploader_id: uploader_id.into(),
            title: title.into(),
            description: description.into(),
            file_path: file_path.into(),
            file_size,
            duration_secs: None,
            thumbnail_path: None,
            status: VideoStatus::Uploaded,
            processing_progress: 0,
            flag_reason: None,
            analysis: None,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VideoRecord {
        VideoRecord::new(
            VideoId::new(),
            TenantId::from_string("acme"),
            "user-1",
            "Launch recap",
            "",
            "/media/videos/x.mp4",
            1024,
        )
    }

    #[test]
    fn test_video_id_generation() {
        let id1 = VideoId::new();
        let id2 = VideoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_record_defaults() {
        let rec = record();
        assert_eq!(rec.status, VideoStatus::Uploaded);
        assert_eq!(rec.processing_progress, 0);
        assert!(rec.duration_secs.is_none());
        assert!(rec.thumbnail_path.is_none());
        assert!(rec.flag_reason.is_none());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            VideoStatus::Uploaded,
            VideoStatus::Processing,
            VideoStatus::Safe,
            VideoStatus::Flagged,
        ] {
            let parsed: VideoStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&VideoStatus::Flagged).unwrap();
        assert_eq!(json, "\"flagged\"");
    }
}
