//! Tenant-scoped repository over the document store.

use std::sync::Arc;

use tracing::{debug, info};

use vguard_models::{AnalysisResults, TenantId, VideoId, VideoRecord, VideoStatus};

use crate::document_store::DocumentStore;
use crate::error::{RepoError, RepoResult};

/// Query filters for listing a tenant's videos.
#[derive(Debug, Default, Clone)]
pub struct VideoQuery {
    pub status: Option<VideoStatus>,
    /// Case-insensitive substring match on title and description.
    pub search: Option<String>,
}

/// Repository for video records, scoped to a single tenant.
///
/// Every read re-checks tenancy: a record that exists but belongs to another
/// tenant is surfaced as [`RepoError::TenantMismatch`], never silently
/// returned.
#[derive(Clone)]
pub struct VideoRepository {
    store: Arc<DocumentStore>,
    tenant_id: TenantId,
}

impl VideoRepository {
    pub fn new(store: Arc<DocumentStore>, tenant_id: TenantId) -> Self {
        Self { store, tenant_id }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    fn check_tenant(&self, record: &VideoRecord) -> RepoResult<()> {
        if record.tenant_id != self.tenant_id {
            return Err(RepoError::TenantMismatch(record.video_id.clone()));
        }
        Ok(())
    }

    /// Create a new video record.
    pub async fn create(&self, record: &VideoRecord) -> RepoResult<()> {
        self.check_tenant(record)?;
        self.store.insert(record).await?;
        info!(video_id = %record.video_id, tenant = %self.tenant_id, "Created video record");
        Ok(())
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &VideoId) -> RepoResult<VideoRecord> {
        let record = self
            .store
            .load(video_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(video_id.clone()))?;
        self.check_tenant(&record)?;
        Ok(record)
    }

    /// List the tenant's videos, newest first.
    pub async fn list(&self, query: &VideoQuery) -> RepoResult<Vec<VideoRecord>> {
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut records: Vec<VideoRecord> = self
            .store
            .load_all()
            .await?
            .into_iter()
            .filter(|r| r.tenant_id == self.tenant_id)
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| match &needle {
                Some(n) => {
                    r.title.to_lowercase().contains(n)
                        || r.description.to_lowercase().contains(n)
                }
                None => true,
            })
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete a video record.
    pub async fn delete(&self, video_id: &VideoId) -> RepoResult<()> {
        // Load first so cross-tenant deletes fail before touching the file.
        self.get(video_id).await?;
        self.store.remove(video_id).await?;
        info!(video_id = %video_id, tenant = %self.tenant_id, "Deleted video record");
        Ok(())
    }

    /// Mark a processing run as started: status becomes `processing`,
    /// progress resets to zero and any previous verdict is cleared. Progress
    /// monotonicity holds within the run that begins here.
    pub async fn begin_run(&self, video_id: &VideoId) -> RepoResult<VideoRecord> {
        self.update(video_id, |r| {
            r.status = VideoStatus::Processing;
            r.processing_progress = 0;
            r.flag_reason = None;
            r.analysis = None;
            Ok(())
        })
        .await
    }

    /// Update processing status.
    pub async fn set_status(&self, video_id: &VideoId, status: VideoStatus) -> RepoResult<()> {
        self.update(video_id, |r| {
            r.status = status;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Update processing progress.
    ///
    /// Progress is monotonic within a run: a value lower than the stored one
    /// is ignored rather than written. Returns the progress now on record.
    pub async fn set_progress(&self, video_id: &VideoId, progress: u8) -> RepoResult<u8> {
        let progress = progress.min(100);
        let record = self
            .update(video_id, |r| {
                if progress > r.processing_progress {
                    r.processing_progress = progress;
                } else {
                    debug!(
                        video_id = %r.video_id,
                        stored = r.processing_progress,
                        offered = progress,
                        "Ignoring non-monotonic progress update"
                    );
                }
                Ok(())
            })
            .await?;
        Ok(record.processing_progress)
    }

    /// Record the probed container duration. Touches nothing else.
    pub async fn set_duration(&self, video_id: &VideoId, duration_secs: f64) -> RepoResult<()> {
        self.update(video_id, |r| {
            r.duration_secs = Some(duration_secs);
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Record the extracted thumbnail path. Touches nothing else.
    pub async fn set_thumbnail(&self, video_id: &VideoId, path: impl Into<String>) -> RepoResult<()> {
        let path = path.into();
        self.update(video_id, |r| {
            r.thumbnail_path = Some(path);
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Write the analysis verdict: results, final status and flag reason in
    /// one update.
    pub async fn set_analysis_result(
        &self,
        video_id: &VideoId,
        results: AnalysisResults,
        status: VideoStatus,
        flag_reason: Option<String>,
    ) -> RepoResult<()> {
        self.update(video_id, |r| {
            r.analysis = Some(results);
            r.status = status;
            r.flag_reason = flag_reason;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Increment the view counter, returning the new count.
    pub async fn increment_views(&self, video_id: &VideoId) -> RepoResult<u64> {
        let record = self
            .update(video_id, |r| {
                r.views += 1;
                Ok(())
            })
            .await?;
        Ok(record.views)
    }

    /// Rename a video.
    pub async fn update_title(&self, video_id: &VideoId, title: impl Into<String>) -> RepoResult<VideoRecord> {
        let title = title.into();
        self.update(video_id, |r| {
            r.title = title;
            Ok(())
        })
        .await
    }

    async fn update<F>(&self, video_id: &VideoId, apply: F) -> RepoResult<VideoRecord>
    where
        F: FnOnce(&mut VideoRecord) -> RepoResult<()>,
    {
        let tenant_id = self.tenant_id.clone();
        self.store
            .update(video_id, |record| {
                if record.tenant_id != tenant_id {
                    return Err(RepoError::TenantMismatch(record.video_id.clone()));
                }
                apply(record)
            })
            .await
    }
}
