//! Processing orchestrator.
//!
//! Drives one video through the pipeline: probe, thumbnail, frame sampling,
//! sensitivity analysis, verdict persistence and cleanup. Runs are detached
//! tasks; the caller gets an immediate accepted/already-running answer and
//! observes progress over the event broadcaster.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use vguard_analysis::{AnalysisOutcome, FrameDecoder, FrameRef, SensitivityAnalyzer};
use vguard_events::EventBroadcaster;
use vguard_media::{FrameSampler, FRAME_SAMPLE_COUNT};
use vguard_models::{
    AnalysisResults, ProcessingStep, TenantId, VideoId, VideoRecord, VideoStatus, WsEvent,
};
use vguard_repo::{DocumentStore, VideoRepository};
use vguard_store::MediaStore;

use crate::error::{PipelineError, PipelineResult};
use crate::run_registry::RunRegistry;

/// Thumbnails are taken at the midpoint of the video.
const THUMBNAIL_FRACTION: f64 = 0.5;

/// Outcome of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run was registered and spawned.
    Started,
    /// A run for this video is already in flight; no new run was spawned.
    AlreadyRunning,
}

/// Orchestrates analysis runs over shared infrastructure.
pub struct ProcessingOrchestrator {
    registry: Arc<RunRegistry>,
    sampler: Arc<dyn FrameSampler>,
    analyzer: SensitivityAnalyzer<Box<dyn FrameDecoder>>,
    media_store: MediaStore,
    doc_store: Arc<DocumentStore>,
    events: Arc<EventBroadcaster>,
}

impl ProcessingOrchestrator {
    pub fn new(
        sampler: Arc<dyn FrameSampler>,
        decoder: Box<dyn FrameDecoder>,
        media_store: MediaStore,
        doc_store: Arc<DocumentStore>,
        events: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            registry: Arc::new(RunRegistry::new()),
            sampler,
            analyzer: SensitivityAnalyzer::with_decoder(decoder),
            media_store,
            doc_store,
            events,
        }
    }

    /// Whether a run for this video is currently registered.
    pub fn is_processing(&self, video_id: &VideoId) -> bool {
        self.registry.is_running(video_id)
    }

    /// Start an analysis run for a video, fire and forget.
    ///
    /// Registration is atomic: when a run is already in flight the request
    /// is absorbed, an `analysis-already-running` notice goes to the video's
    /// room and the in-flight run is untouched. Otherwise the record is
    /// moved to `processing`/0 and the run is spawned as a detached task.
    pub async fn start_processing(
        self: &Arc<Self>,
        tenant_id: TenantId,
        video_id: VideoId,
    ) -> PipelineResult<StartOutcome> {
        let repo = VideoRepository::new(self.doc_store.clone(), tenant_id);
        let record = repo.get(&video_id).await?;

        let Some(guard) = self.registry.try_register(&video_id) else {
            info!(video_id = %video_id, "Analysis already running, absorbing start request");
            self.events.publish(WsEvent::already_running(video_id.as_str()));
            return Ok(StartOutcome::AlreadyRunning);
        };

        repo.begin_run(&video_id).await?;
        self.events.publish(WsEvent::processing_update(
            video_id.as_str(),
            0,
            VideoStatus::Processing,
            ProcessingStep::Initializing,
        ));

        let orchestrator = self.clone();
        tokio::spawn(async move {
            // Guard lives for the whole run; drop deregisters on every exit
            // path.
            let _guard = guard;
            let video_id = record.video_id.clone();

            if let Err(e) = orchestrator.run(&repo, record).await {
                error!(video_id = %video_id, error = %e, "Analysis run failed");
                // Sampled frames must not outlive the run, failed or not.
                if let Err(e) = orchestrator.media_store.remove_frames(&video_id).await {
                    warn!(video_id = %video_id, error = %e, "Frame cleanup failed");
                }
            }
        });

        Ok(StartOutcome::Started)
    }

    async fn run(&self, repo: &VideoRepository, record: VideoRecord) -> PipelineResult<()> {
        let video_id = record.video_id.clone();
        let source = PathBuf::from(&record.file_path);
        if !source.exists() {
            return Err(PipelineError::SourceMissing(source));
        }

        self.checkpoint(repo, &video_id, 10, VideoStatus::Processing, ProcessingStep::Initializing)
            .await?;

        // Duration is best effort; an unreadable container fails later at
        // extraction with a better error.
        if let Some(duration) = self.sampler.probe_duration(&source).await? {
            repo.set_duration(&video_id, duration).await?;
        }

        self.checkpoint(
            repo,
            &video_id,
            30,
            VideoStatus::Processing,
            ProcessingStep::ExtractingFrames,
        )
        .await?;

        let thumb_path = self.media_store.thumbnail_path(&video_id);
        self.sampler
            .extract_thumbnail(&source, THUMBNAIL_FRACTION, &thumb_path)
            .await?;
        repo.set_thumbnail(&video_id, thumb_path.to_string_lossy())
            .await?;

        let frames_dir = self.media_store.frames_dir(&video_id);
        let sampled = self
            .sampler
            .extract_frames(&source, FRAME_SAMPLE_COUNT, &frames_dir)
            .await?;
        let frame_refs: Vec<FrameRef> = sampled
            .iter()
            .map(|f| FrameRef::new(f.path.clone(), f.timestamp_secs))
            .collect();

        let outcome = self.analyze_frames(repo, &video_id, &frame_refs).await?;

        self.checkpoint(repo, &video_id, 95, VideoStatus::Processing, ProcessingStep::Finalizing)
            .await?;

        let status = if outcome.verdict.is_safe {
            VideoStatus::Safe
        } else {
            VideoStatus::Flagged
        };
        let flag_reason = outcome.verdict.reason.clone();
        let results = AnalysisResults::from_frames(outcome.frames, &outcome.verdict);
        repo.set_analysis_result(&video_id, results, status, flag_reason)
            .await?;

        self.checkpoint(repo, &video_id, 98, status, ProcessingStep::Finalizing)
            .await?;

        self.media_store.remove_frames(&video_id).await?;

        repo.set_progress(&video_id, 100).await?;
        self.events.publish(WsEvent::processing_update(
            video_id.as_str(),
            100,
            status,
            ProcessingStep::Complete,
        ));
        self.events
            .publish(WsEvent::processing_complete(video_id.as_str(), status));

        info!(video_id = %video_id, status = %status, "Analysis run complete");
        Ok(())
    }

    async fn analyze_frames(
        &self,
        repo: &VideoRepository,
        video_id: &VideoId,
        frames: &[FrameRef],
    ) -> PipelineResult<AnalysisOutcome> {
        let events = self.events.clone();
        let repo_cb = repo.clone();
        let vid = video_id.clone();

        let outcome = self
            .analyzer
            .analyze(frames, move |evaluated, total| {
                let repo = repo_cb.clone();
                let events = events.clone();
                let vid = vid.clone();
                async move {
                    let progress = analysis_progress(evaluated, total);
                    if let Err(e) = repo.set_progress(&vid, progress).await {
                        warn!(video_id = %vid, error = %e, "Failed to persist frame checkpoint");
                    }
                    events.publish(WsEvent::processing_update(
                        vid.as_str(),
                        progress,
                        VideoStatus::Processing,
                        ProcessingStep::AnalyzingContent,
                    ));
                }
            })
            .await?;
        Ok(outcome)
    }

    /// Persist a progress checkpoint, then broadcast it.
    async fn checkpoint(
        &self,
        repo: &VideoRepository,
        video_id: &VideoId,
        progress: u8,
        status: VideoStatus,
        step: ProcessingStep,
    ) -> PipelineResult<()> {
        let persisted = repo.set_progress(video_id, progress).await?;
        self.events.publish(WsEvent::processing_update(
            video_id.as_str(),
            persisted,
            status,
            step,
        ));
        Ok(())
    }
}

/// Per-frame progress inside the 30..=90 analysis band.
fn analysis_progress(evaluated: usize, total: usize) -> u8 {
    if total == 0 {
        return 90;
    }
    let band = 30 + (evaluated * 60) / total;
    band.min(90) as u8
}
