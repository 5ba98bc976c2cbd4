//! Red-dominance heuristic over sampled frames.

use std::path::PathBuf;

use tracing::debug;

use vguard_models::{FrameScore, SensitivityVerdict};

use crate::decoder::{FrameDecoder, FramePixels, ImageFrameDecoder};
use crate::error::AnalyzerResult;

/// Red channel value a pixel must exceed to count as red-dominant.
pub const RED_THRESHOLD: u8 = 180;

/// Fraction of red-dominant pixels a single frame must exceed to flag the
/// video. Comparison is strict; a frame at exactly the limit passes.
pub const RED_RATIO_LIMIT: f64 = 0.25;

/// Reason string attached to flagged verdicts.
pub const FLAG_REASON: &str = "Red-dominant frames detected";

/// Reference to a sampled frame awaiting analysis.
#[derive(Debug, Clone)]
pub struct FrameRef {
    pub path: PathBuf,
    pub timestamp_secs: Option<f64>,
}

impl FrameRef {
    pub fn new(path: impl Into<PathBuf>, timestamp_secs: Option<f64>) -> Self {
        Self {
            path: path.into(),
            timestamp_secs,
        }
    }
}

/// Verdict plus the per-frame scores gathered along the way.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub verdict: SensitivityVerdict,
    /// Scores for every evaluated frame, in order. Short-circuited runs
    /// carry fewer entries than the input frame count.
    pub frames: Vec<FrameScore>,
}

/// Analyzer over a pluggable frame decoder.
pub struct SensitivityAnalyzer<D: FrameDecoder = ImageFrameDecoder> {
    decoder: D,
}

impl SensitivityAnalyzer<ImageFrameDecoder> {
    pub fn new() -> Self {
        Self {
            decoder: ImageFrameDecoder::new(),
        }
    }
}

impl Default for SensitivityAnalyzer<ImageFrameDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: FrameDecoder> SensitivityAnalyzer<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// Analyze sampled frames in order.
    ///
    /// `on_frame(evaluated, total)` fires after each frame so the caller can
    /// persist and emit progress checkpoints. Analysis stops at the first
    /// frame whose red-dominant ratio strictly exceeds [`RED_RATIO_LIMIT`];
    /// remaining frames are not decoded.
    pub async fn analyze<F, Fut>(
        &self,
        frames: &[FrameRef],
        mut on_frame: F,
    ) -> AnalyzerResult<AnalysisOutcome>
    where
        F: FnMut(usize, usize) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let total = frames.len();
        let mut scores = Vec::with_capacity(total);

        for (index, frame) in frames.iter().enumerate() {
            let pixels = self.decoder.decode(&frame.path).await?;
            let ratio = red_ratio(&pixels);
            let flagged = ratio > RED_RATIO_LIMIT;

            debug!(
                frame = index,
                ratio, flagged, "Evaluated frame red-dominance"
            );

            scores.push(FrameScore {
                timestamp_secs: frame.timestamp_secs,
                score: ratio,
                flagged,
            });
            on_frame(index + 1, total).await;

            if flagged {
                return Ok(AnalysisOutcome {
                    verdict: SensitivityVerdict::flagged(FLAG_REASON),
                    frames: scores,
                });
            }
        }

        Ok(AnalysisOutcome {
            verdict: SensitivityVerdict::safe(),
            frames: scores,
        })
    }
}

/// Fraction of pixels whose red channel strictly exceeds [`RED_THRESHOLD`].
fn red_ratio(pixels: &FramePixels) -> f64 {
    let total = pixels.pixel_count();
    if total == 0 {
        return 0.0;
    }
    let red = pixels
        .red_samples()
        .filter(|r| *r > RED_THRESHOLD)
        .count();
    red as f64 / total as f64
}
