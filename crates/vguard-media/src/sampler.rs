//! Frame sampling and thumbnail extraction.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe;

/// Number of frames sampled per video.
pub const FRAME_SAMPLE_COUNT: usize = 5;

/// Sampled frames are normalized to this size before analysis.
pub const FRAME_SCALE: &str = "scale=640:480";

/// Thumbnails are resized to this width with preserved aspect ratio.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 480;

/// A decoded still image extracted from the source video.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub path: PathBuf,
    /// Timestamp the frame was taken at, when the duration was known
    pub timestamp_secs: Option<f64>,
}

/// Extracts still frames and thumbnails from a source video.
///
/// Behind a trait so the pipeline can be exercised without ffmpeg installed.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Extract `count` frames at evenly spaced timestamps into `out_dir`.
    ///
    /// Fails with [`MediaError::Decode`] if the source is not a decodable
    /// media container.
    async fn extract_frames(
        &self,
        source: &Path,
        count: usize,
        out_dir: &Path,
    ) -> MediaResult<Vec<SampledFrame>>;

    /// Produce one representative still at `at_fraction` of the duration,
    /// resized to a fixed width with preserved aspect ratio.
    async fn extract_thumbnail(
        &self,
        source: &Path,
        at_fraction: f64,
        out_path: &Path,
    ) -> MediaResult<()>;

    /// Best-effort duration probe; `None` means the caller must leave the
    /// duration field untouched.
    async fn probe_duration(&self, source: &Path) -> MediaResult<Option<f64>>;
}

/// Production sampler shelling out to ffmpeg/ffprobe.
#[derive(Debug, Default)]
pub struct FfmpegSampler {
    /// Per-invocation timeout in seconds, unlimited when unset
    timeout_secs: Option<u64>,
}

impl FfmpegSampler {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    /// Evenly spaced timestamps across a known duration, or second offsets
    /// from the start when the duration is unknown.
    fn frame_timestamps(duration_secs: Option<f64>, count: usize) -> Vec<(f64, Option<f64>)> {
        (0..count)
            .map(|i| match duration_secs {
                Some(d) => {
                    let ts = d * (i as f64 + 1.0) / (count as f64 + 1.0);
                    (ts, Some(ts))
                }
                None => (i as f64, None),
            })
            .collect()
    }
}

#[async_trait]
impl FrameSampler for FfmpegSampler {
    async fn extract_frames(
        &self,
        source: &Path,
        count: usize,
        out_dir: &Path,
    ) -> MediaResult<Vec<SampledFrame>> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        fs::create_dir_all(out_dir).await?;

        let duration = probe::probe_duration(source).await.map_err(to_decode)?;
        let timestamps = Self::frame_timestamps(duration, count);

        let mut frames = Vec::with_capacity(count);
        for (index, (seek_to, timestamp_secs)) in timestamps.into_iter().enumerate() {
            let path = out_dir.join(format!("frame-{index}.png"));
            let cmd = FfmpegCommand::new(source, &path)
                .seek(seek_to)
                .single_frame()
                .video_filter(FRAME_SCALE)
                .log_level("error");

            self.runner().run(&cmd).await.map_err(to_decode)?;
            debug!(frame = index, path = %path.display(), "Extracted frame");

            frames.push(SampledFrame {
                path,
                timestamp_secs,
            });
        }

        Ok(frames)
    }

    async fn extract_thumbnail(
        &self,
        source: &Path,
        at_fraction: f64,
        out_path: &Path,
    ) -> MediaResult<()> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let duration = probe::probe_duration(source).await.map_err(to_decode)?;
        let seek_to = duration.map(|d| d * at_fraction.clamp(0.0, 1.0)).unwrap_or(0.0);

        let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);
        let cmd = FfmpegCommand::new(source, out_path)
            .seek(seek_to)
            .single_frame()
            .video_filter(&filter)
            .log_level("error");

        self.runner().run(&cmd).await.map_err(to_decode)
    }

    async fn probe_duration(&self, source: &Path) -> MediaResult<Option<f64>> {
        probe::probe_duration(source).await
    }
}

/// Collapse ffmpeg/ffprobe process failures into the container decode error
/// the pipeline reports; tooling and IO errors pass through unchanged.
fn to_decode(err: MediaError) -> MediaError {
    match err {
        MediaError::FfmpegFailed {
            message, stderr, ..
        } => MediaError::Decode(stderr.unwrap_or(message)),
        MediaError::FfprobeFailed { message, stderr } => {
            MediaError::Decode(stderr.unwrap_or(message))
        }
        other => other,
    }
}
