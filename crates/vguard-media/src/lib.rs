//! FFmpeg CLI wrapper for frame sampling.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Best-effort duration probing via ffprobe
//! - Fixed-count frame extraction and thumbnail generation

pub mod command;
pub mod error;
pub mod probe;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_duration, probe_video, VideoInfo};
pub use sampler::{
    FfmpegSampler, FrameSampler, SampledFrame, FRAME_SAMPLE_COUNT, THUMBNAIL_SCALE_WIDTH,
};
