//! One-file-per-video JSON document store.
//!
//! Each record lives at `<dir>/<video_id>.json`. Writes go to a temp file in
//! the same directory followed by a rename, so readers never observe a
//! half-written document. A store-wide async mutex serializes read-modify-
//! write cycles.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use vguard_models::{VideoId, VideoRecord};

use crate::error::{RepoError, RepoResult};

pub struct DocumentStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the backing directory if it does not exist.
    pub async fn ensure_dir(&self) -> RepoResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn doc_path(&self, video_id: &VideoId) -> PathBuf {
        self.dir.join(format!("{video_id}.json"))
    }

    /// Persist a new record. Overwrites any existing document with the same
    /// ID; callers generate fresh UUIDs so collisions do not occur in
    /// practice.
    pub async fn insert(&self, record: &VideoRecord) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_document(record).await?;
        debug!(video_id = %record.video_id, "Created video record");
        Ok(())
    }

    /// Load a record by ID, `None` if no document exists.
    pub async fn load(&self, video_id: &VideoId) -> RepoResult<Option<VideoRecord>> {
        read_document(&self.doc_path(video_id)).await
    }

    /// Load every record in the store.
    pub async fn load_all(&self) -> RepoResult<Vec<VideoRecord>> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = read_document(&path).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Atomically read-modify-write a record. The closure may reject the
    /// update; `updated_at` is refreshed on success.
    pub async fn update<F>(&self, video_id: &VideoId, apply: F) -> RepoResult<VideoRecord>
    where
        F: FnOnce(&mut VideoRecord) -> RepoResult<()>,
    {
        let _guard = self.write_lock.lock().await;

        let mut record = read_document(&self.doc_path(video_id))
            .await?
            .ok_or_else(|| RepoError::NotFound(video_id.clone()))?;

        apply(&mut record)?;
        record.updated_at = Utc::now();

        self.write_document(&record).await?;
        Ok(record)
    }

    /// Remove a document. Missing documents are reported as not found.
    pub async fn remove(&self, video_id: &VideoId) -> RepoResult<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.doc_path(video_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RepoError::NotFound(video_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, record: &VideoRecord) -> RepoResult<()> {
        let path = self.doc_path(&record.video_id);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

async fn read_document(path: &Path) -> RepoResult<Option<VideoRecord>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vguard_models::TenantId;

    fn record(tenant: &str) -> VideoRecord {
        VideoRecord::new(
            VideoId::new(),
            TenantId::from_string(tenant),
            "user-1",
            "Title",
            "",
            "/media/videos/x.mp4",
            42,
        )
    }

    #[tokio::test]
    async fn test_insert_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let rec = record("acme");
        store.insert(&rec).await.unwrap();

        let loaded = store.load(&rec.video_id).await.unwrap().unwrap();
        assert_eq!(loaded.video_id, rec.video_id);
        assert_eq!(loaded.title, "Title");

        // No stray temp files after a write.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(names.iter().all(|n| n.ends_with(".json")), "{names:?}");
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let rec = record("acme");
        store.insert(&rec).await.unwrap();

        let updated = store
            .update(&rec.video_id, |r| {
                r.title = "Renamed".to_string();
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert!(updated.updated_at >= rec.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let err = store
            .update(&VideoId::new(), |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_all_skips_non_json() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        store.insert(&record("acme")).await.unwrap();
        store.insert(&record("acme")).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path());
        store.ensure_dir().await.unwrap();

        let rec = record("acme");
        store.insert(&rec).await.unwrap();
        store.remove(&rec.video_id).await.unwrap();

        assert!(store.load(&rec.video_id).await.unwrap().is_none());
        assert!(matches!(
            store.remove(&rec.video_id).await.unwrap_err(),
            RepoError::NotFound(_)
        ));
    }
}
