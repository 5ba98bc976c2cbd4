//! Application state.

use std::sync::Arc;

use vguard_analysis::ImageFrameDecoder;
use vguard_events::EventBroadcaster;
use vguard_media::FfmpegSampler;
use vguard_pipeline::ProcessingOrchestrator;
use vguard_repo::{DocumentStore, VideoRepository};
use vguard_store::MediaStore;

use vguard_models::TenantId;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub media_store: MediaStore,
    pub doc_store: Arc<DocumentStore>,
    pub events: Arc<EventBroadcaster>,
    pub orchestrator: Arc<ProcessingOrchestrator>,
}

impl AppState {
    /// Create new application state and prepare the on-disk layout.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let media_store = MediaStore::new(&config.media_root);
        media_store.ensure_layout().await?;

        let doc_store = Arc::new(DocumentStore::new(&config.data_dir));
        doc_store.ensure_dir().await?;

        let events = Arc::new(EventBroadcaster::default());

        let orchestrator = Arc::new(ProcessingOrchestrator::new(
            Arc::new(FfmpegSampler::new()),
            Box::new(ImageFrameDecoder::new()),
            media_store.clone(),
            doc_store.clone(),
            events.clone(),
        ));

        Ok(Self {
            config,
            media_store,
            doc_store,
            events,
            orchestrator,
        })
    }

    /// Repository scoped to one tenant.
    pub fn repo(&self, tenant_id: TenantId) -> VideoRepository {
        VideoRepository::new(self.doc_store.clone(), tenant_id)
    }
}
