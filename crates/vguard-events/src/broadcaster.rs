//! Per-video rooms over `tokio::sync::broadcast` channels.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use vguard_models::WsEvent;

/// Default buffer capacity per room.
///
/// A full pipeline run publishes on the order of a dozen events, so slow
/// receivers only lag when they stop draining entirely.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out hub for pipeline events.
///
/// Each video gets its own broadcast room, created lazily on first subscribe
/// and dropped once it has no receivers. Events published to a room are
/// observed by its subscribers in publish order. The global channel is
/// independent and carries events addressed to every connected client.
pub struct EventBroadcaster {
    rooms: RwLock<HashMap<String, broadcast::Sender<WsEvent>>>,
    global: broadcast::Sender<WsEvent>,
    capacity: usize,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        Self {
            rooms: RwLock::new(HashMap::new()),
            global,
            capacity,
        }
    }

    /// Join a video's room.
    pub fn subscribe(&self, video_id: &str) -> broadcast::Receiver<WsEvent> {
        let mut rooms = self.rooms.write().expect("rooms lock poisoned");
        rooms
            .entry(video_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to its video's room.
    ///
    /// Events without a room, or whose room has no receivers, are dropped;
    /// progress is still persisted by the pipeline, so late subscribers
    /// recover state from the record. Empty rooms are garbage collected
    /// here.
    pub fn publish(&self, event: WsEvent) {
        let video_id = event.video_id().to_string();

        let sender = {
            let rooms = self.rooms.read().expect("rooms lock poisoned");
            rooms.get(&video_id).cloned()
        };

        let Some(sender) = sender else {
            debug!(video_id = %video_id, "No room for event, dropping");
            return;
        };

        if sender.send(event).is_err() {
            // SendError means zero receivers; drop the room.
            let mut rooms = self.rooms.write().expect("rooms lock poisoned");
            if let Some(s) = rooms.get(&video_id) {
                if s.receiver_count() == 0 {
                    rooms.remove(&video_id);
                    debug!(video_id = %video_id, "Dropped empty room");
                }
            }
        }
    }

    /// Subscribe to events addressed to every client.
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global.subscribe()
    }

    /// Publish to every connected client. Silently dropped when no client
    /// is connected.
    pub fn publish_global(&self, event: WsEvent) {
        let _ = self.global.send(event);
    }

    /// Number of live rooms. Test and diagnostics hook.
    pub fn room_count(&self) -> usize {
        self.rooms.read().expect("rooms lock poisoned").len()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
