//! At-most-one-run-per-video tracking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;

use vguard_models::VideoId;

/// Tracks which videos currently have an analysis run in flight.
///
/// Registration is an atomic insert-if-absent under one lock, so two
/// concurrent starts for the same video cannot both win. The returned
/// [`RunGuard`] deregisters on drop, which covers every exit path of the
/// run, panics included.
#[derive(Default)]
pub struct RunRegistry {
    running: Mutex<HashSet<String>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the run slot for a video. Returns `None` when a run is already
    /// registered.
    pub fn try_register(self: &Arc<Self>, video_id: &VideoId) -> Option<RunGuard> {
        let mut running = self.running.lock().expect("run registry poisoned");
        if !running.insert(video_id.to_string()) {
            return None;
        }
        debug!(video_id = %video_id, "Registered analysis run");
        Some(RunGuard {
            registry: self.clone(),
            video_id: video_id.to_string(),
            started_at: Utc::now(),
        })
    }

    pub fn is_running(&self, video_id: &VideoId) -> bool {
        self.running
            .lock()
            .expect("run registry poisoned")
            .contains(video_id.as_str())
    }

    pub fn active_count(&self) -> usize {
        self.running.lock().expect("run registry poisoned").len()
    }

    fn deregister(&self, video_id: &str) {
        self.running
            .lock()
            .expect("run registry poisoned")
            .remove(video_id);
        debug!(video_id = %video_id, "Deregistered analysis run");
    }
}

/// Ownership token for a registered run.
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    video_id: String,
    started_at: DateTime<Utc>,
}

impl RunGuard {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.video_id);
    }
}
