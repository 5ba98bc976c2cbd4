//! WebSocket event types.
//!
//! Wire names match the event names the dashboard and player subscribe to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::video::VideoStatus;

/// Pipeline step reported alongside progress checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingStep {
    Initializing,
    ExtractingFrames,
    AnalyzingContent,
    Finalizing,
    Complete,
}

impl ProcessingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStep::Initializing => "initializing",
            ProcessingStep::ExtractingFrames => "extracting-frames",
            ProcessingStep::AnalyzingContent => "analyzing-content",
            ProcessingStep::Finalizing => "finalizing",
            ProcessingStep::Complete => "complete",
        }
    }
}

/// Event envelope delivered over the live channel.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WsEvent {
    /// Progress checkpoint for one video's run
    ProcessingUpdate {
        #[serde(rename = "videoId")]
        video_id: String,
        progress: u8,
        status: VideoStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<ProcessingStep>,
    },

    /// Terminal event for one video's run
    ProcessingComplete {
        #[serde(rename = "videoId")]
        video_id: String,
        status: VideoStatus,
    },

    /// Global notice that a new upload exists
    UploadComplete {
        #[serde(rename = "videoId")]
        video_id: String,
        status: VideoStatus,
    },

    /// Duplicate-run suppression notice
    AnalysisAlreadyRunning {
        #[serde(rename = "videoId")]
        video_id: String,
        message: String,
    },
}

impl WsEvent {
    /// Create a progress checkpoint event.
    pub fn processing_update(
        video_id: impl Into<String>,
        progress: u8,
        status: VideoStatus,
        step: ProcessingStep,
    ) -> Self {
        WsEvent::ProcessingUpdate {
            video_id: video_id.into(),
            progress: progress.min(100),
            status,
            step: Some(step),
        }
    }

    /// Create a terminal completion event.
    pub fn processing_complete(video_id: impl Into<String>, status: VideoStatus) -> Self {
        WsEvent::ProcessingComplete {
            video_id: video_id.into(),
            status,
        }
    }

    /// Create a global upload notice.
    pub fn upload_complete(video_id: impl Into<String>) -> Self {
        WsEvent::UploadComplete {
            video_id: video_id.into(),
            status: VideoStatus::Uploaded,
        }
    }

    /// Create a duplicate-run suppression notice.
    pub fn already_running(video_id: impl Into<String>) -> Self {
        let video_id = video_id.into();
        let message = format!("Analysis already running for video {video_id}");
        WsEvent::AnalysisAlreadyRunning { video_id, message }
    }

    /// The video this event concerns.
    pub fn video_id(&self) -> &str {
        match self {
            WsEvent::ProcessingUpdate { video_id, .. }
            | WsEvent::ProcessingComplete { video_id, .. }
            | WsEvent::UploadComplete { video_id, .. }
            | WsEvent::AnalysisAlreadyRunning { video_id, .. } => video_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_update_wire_format() {
        let event = WsEvent::processing_update(
            "vid-1",
            30,
            VideoStatus::Processing,
            ProcessingStep::AnalyzingContent,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"processing-update\""));
        assert!(json.contains("\"videoId\":\"vid-1\""));
        assert!(json.contains("\"progress\":30"));
        assert!(json.contains("\"step\":\"analyzing-content\""));
    }

    #[test]
    fn test_progress_clamped_to_100() {
        let event = WsEvent::processing_update(
            "vid-1",
            255,
            VideoStatus::Processing,
            ProcessingStep::Complete,
        );
        match event {
            WsEvent::ProcessingUpdate { progress, .. } => assert_eq!(progress, 100),
            _ => panic!("expected ProcessingUpdate"),
        }
    }

    #[test]
    fn test_terminal_event_wire_format() {
        let event = WsEvent::processing_complete("vid-2", VideoStatus::Flagged);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"processing-complete\""));
        assert!(json.contains("\"status\":\"flagged\""));
    }
}
