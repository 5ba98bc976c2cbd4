//! Frame pixel decoding.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Raw pixel samples of a decoded frame, packed RGB8.
#[derive(Debug, Clone)]
pub struct FramePixels {
    rgb: Vec<u8>,
}

impl FramePixels {
    /// Wrap a packed RGB8 buffer. The length must be a multiple of three.
    pub fn from_rgb8(rgb: Vec<u8>) -> Self {
        debug_assert_eq!(rgb.len() % 3, 0, "RGB8 buffer length must be n*3");
        Self { rgb }
    }

    /// Number of pixels in the frame.
    pub fn pixel_count(&self) -> usize {
        self.rgb.len() / 3
    }

    /// Iterate over red channel samples.
    pub fn red_samples(&self) -> impl Iterator<Item = u8> + '_ {
        self.rgb.iter().step_by(3).copied()
    }
}

/// Decodes a frame file into raw pixel samples.
///
/// Behind a trait so tests can count decode calls and feed synthetic pixels.
#[async_trait]
pub trait FrameDecoder: Send + Sync {
    async fn decode(&self, path: &Path) -> AnalyzerResult<FramePixels>;
}

#[async_trait]
impl FrameDecoder for Box<dyn FrameDecoder> {
    async fn decode(&self, path: &Path) -> AnalyzerResult<FramePixels> {
        (**self).decode(path).await
    }
}

/// Production decoder backed by the `image` crate.
#[derive(Debug, Default)]
pub struct ImageFrameDecoder;

impl ImageFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FrameDecoder for ImageFrameDecoder {
    async fn decode(&self, path: &Path) -> AnalyzerResult<FramePixels> {
        let path = path.to_path_buf();

        // Image decoding is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let img = image::open(&path)
                .map_err(|e| AnalyzerError::frame_decode(&path, e.to_string()))?;
            Ok(FramePixels::from_rgb8(img.to_rgb8().into_raw()))
        })
        .await
        .map_err(|_| AnalyzerError::TaskAborted)?
    }
}
