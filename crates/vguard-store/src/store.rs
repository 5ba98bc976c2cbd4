//! Local filesystem layout for uploaded media and derived artifacts.
//!
//! All paths are derived from the video ID:
//!
//! ```text
//! <root>/videos/<id>.<ext>
//! <root>/thumbnails/<id>.jpg
//! <root>/frames/<id>/frame-<n>.png
//! ```

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use vguard_models::VideoId;

use crate::error::{StorageError, StorageResult};

/// Extensions accepted for stored video files, matched case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov"];

/// Local media store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the store directories if they do not exist.
    pub async fn ensure_layout(&self) -> StorageResult<()> {
        fs::create_dir_all(self.root.join("videos")).await?;
        fs::create_dir_all(self.root.join("thumbnails")).await?;
        fs::create_dir_all(self.root.join("frames")).await?;
        Ok(())
    }

    pub fn video_path(&self, video_id: &VideoId, ext: &str) -> PathBuf {
        self.root.join("videos").join(format!("{video_id}.{ext}"))
    }

    pub fn thumbnail_path(&self, video_id: &VideoId) -> PathBuf {
        self.root.join("thumbnails").join(format!("{video_id}.jpg"))
    }

    pub fn frames_dir(&self, video_id: &VideoId) -> PathBuf {
        self.root.join("frames").join(video_id.to_string())
    }

    /// Move an uploaded file into the store under the video's ID.
    ///
    /// Handles cross-device moves: a plain rename is tried first, and on
    /// EXDEV the file is copied to a temp name next to the destination and
    /// renamed into place.
    pub async fn ingest_video(
        &self,
        src: &Path,
        video_id: &VideoId,
        ext: &str,
    ) -> StorageResult<PathBuf> {
        let ext = normalize_extension(ext)?;
        let dst = self.video_path(video_id, ext);
        move_file(src, &dst).await?;
        debug!(video_id = %video_id, path = %dst.display(), "Ingested video file");
        Ok(dst)
    }

    /// Byte size of the stored video file.
    pub async fn video_size(&self, path: &Path) -> StorageResult<u64> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the sampled-frames directory for a video. Missing directories
    /// are not an error.
    pub async fn remove_frames(&self, video_id: &VideoId) -> StorageResult<()> {
        let dir = self.frames_dir(video_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(video_id = %video_id, "Removed sampled frames");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every stored artifact for a video: the source file, the
    /// thumbnail and any sampled frames. Best-effort on the derived
    /// artifacts, strict on the source file.
    pub async fn remove_all(&self, video_id: &VideoId, video_path: &Path) -> StorageResult<()> {
        match fs::remove_file(video_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(video_id = %video_id, "Video file already absent on delete");
            }
            Err(e) => return Err(e.into()),
        }

        let thumb = self.thumbnail_path(video_id);
        if let Err(e) = fs::remove_file(&thumb).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(video_id = %video_id, error = %e, "Failed to remove thumbnail");
            }
        }

        self.remove_frames(video_id).await
    }
}

/// Validate and lowercase a video extension.
fn normalize_extension(ext: &str) -> StorageResult<&'static str> {
    let lower = ext.to_ascii_lowercase();
    VIDEO_EXTENSIONS
        .iter()
        .find(|e| **e == lower)
        .copied()
        .ok_or_else(|| StorageError::UnsupportedExtension(ext.to_string()))
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// A fast rename is tried first. On EXDEV the file is copied to a temp file
/// next to `dst` and renamed into place, so readers never observe a partial
/// destination file.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> StorageResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> StorageResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(e.into());
    }

    // Best effort on the source; the destination is already in place.
    if let Err(e) = fs::remove_file(src).await {
        warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MediaStore) {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_layout_paths() {
        let (_dir, store) = store();
        let id = VideoId::new();

        assert!(store
            .video_path(&id, "mp4")
            .ends_with(format!("videos/{id}.mp4")));
        assert!(store
            .thumbnail_path(&id)
            .ends_with(format!("thumbnails/{id}.jpg")));
        assert!(store.frames_dir(&id).ends_with(format!("frames/{id}")));
    }

    #[tokio::test]
    async fn test_ingest_moves_upload_into_store() {
        let (dir, store) = store();
        store.ensure_layout().await.unwrap();

        let upload = dir.path().join("upload.part");
        fs::write(&upload, b"video bytes").await.unwrap();

        let id = VideoId::new();
        let dst = store.ingest_video(&upload, &id, "MP4").await.unwrap();

        assert!(!upload.exists());
        assert_eq!(dst, store.video_path(&id, "mp4"));
        assert_eq!(fs::read(&dst).await.unwrap(), b"video bytes");
        assert_eq!(store.video_size(&dst).await.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_ingest_rejects_unknown_extension() {
        let (dir, store) = store();
        let upload = dir.path().join("upload.part");
        fs::write(&upload, b"x").await.unwrap();

        let err = store
            .ingest_video(&upload, &VideoId::new(), "exe")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedExtension(_)));
        assert!(upload.exists(), "rejected upload must not be consumed");
    }

    #[tokio::test]
    async fn test_remove_frames_is_idempotent() {
        let (_dir, store) = store();
        let id = VideoId::new();

        let frames = store.frames_dir(&id);
        fs::create_dir_all(&frames).await.unwrap();
        fs::write(frames.join("frame-0.png"), b"png").await.unwrap();

        store.remove_frames(&id).await.unwrap();
        assert!(!frames.exists());

        // Second removal must not error.
        store.remove_frames(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_all_clears_every_artifact() {
        let (_dir, store) = store();
        store.ensure_layout().await.unwrap();
        let id = VideoId::new();

        let video = store.video_path(&id, "webm");
        fs::write(&video, b"v").await.unwrap();
        fs::write(store.thumbnail_path(&id), b"t").await.unwrap();
        let frames = store.frames_dir(&id);
        fs::create_dir_all(&frames).await.unwrap();
        fs::write(frames.join("frame-0.png"), b"f").await.unwrap();

        store.remove_all(&id, &video).await.unwrap();

        assert!(!video.exists());
        assert!(!store.thumbnail_path(&id).exists());
        assert!(!frames.exists());
    }

    #[tokio::test]
    async fn test_video_size_missing_file() {
        let (_dir, store) = store();
        let err = store
            .video_size(Path::new("/nonexistent/video.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
