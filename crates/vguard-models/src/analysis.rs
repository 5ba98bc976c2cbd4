//! Sensitivity analysis result models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Verdict returned by the sensitivity analyzer.
///
/// `reason` is set only when `is_safe` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SensitivityVerdict {
    pub is_safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SensitivityVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            reason: None,
        }
    }

    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            reason: Some(reason.into()),
        }
    }
}

/// Score for a single sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameScore {
    /// Timestamp of the frame in seconds, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_secs: Option<f64>,
    /// Fraction of pixels whose red channel exceeded the threshold
    pub score: f64,
    /// Whether this frame tripped the ratio limit
    pub flagged: bool,
}

/// Audio analysis sub-record.
///
/// Populated by a transcription backend when one is configured; the pixel
/// heuristic pipeline leaves it empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default)]
    pub sensitive_words: Vec<String>,
    #[serde(default)]
    pub score: f64,
}

/// Overall verdict across all evaluated frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverallVerdict {
    /// Highest per-frame score observed
    pub score: f64,
    pub is_safe: bool,
    #[serde(default)]
    pub flag_reasons: Vec<String>,
}

/// Structured analysis results persisted onto the video record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResults {
    /// Per-frame scores, in evaluation order. Short-circuited runs carry
    /// fewer entries than the sampled frame count.
    #[serde(default)]
    pub frames: Vec<FrameScore>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioAnalysis>,

    pub overall: OverallVerdict,
}

impl AnalysisResults {
    /// Build results from per-frame scores and the final verdict.
    pub fn from_frames(frames: Vec<FrameScore>, verdict: &SensitivityVerdict) -> Self {
        let score = frames.iter().map(|f| f.score).fold(0.0_f64, f64::max);
        Self {
            frames,
            audio: None,
            overall: OverallVerdict {
                score,
                is_safe: verdict.is_safe,
                flag_reasons: verdict.reason.clone().into_iter().collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_frames_takes_max_score() {
        let frames = vec![
            FrameScore {
                timestamp_secs: Some(1.0),
                score: 0.1,
                flagged: false,
            },
            FrameScore {
                timestamp_secs: Some(2.0),
                score: 0.4,
                flagged: true,
            },
        ];
        let results = AnalysisResults::from_frames(frames, &SensitivityVerdict::flagged("red"));
        assert!((results.overall.score - 0.4).abs() < f64::EPSILON);
        assert!(!results.overall.is_safe);
        assert_eq!(results.overall.flag_reasons, vec!["red".to_string()]);
    }

    #[test]
    fn test_safe_verdict_has_no_reason() {
        let verdict = SensitivityVerdict::safe();
        assert!(verdict.is_safe);
        assert!(verdict.reason.is_none());
    }
}
