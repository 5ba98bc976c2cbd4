//! Live progress channel.
//!
//! One WebSocket per client. The client joins a video's room with
//! `{"action":"join","videoId":"..."}` and from then on receives that
//! video's pipeline events as JSON, alongside the global notices every
//! client gets. Rooms accumulate: a dashboard following several in-flight
//! uploads joins each one and receives per-video progress for all of them
//! until it leaves the room or disconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vguard_events::EventBroadcaster;
use vguard_models::WsEvent;

use crate::auth::verify_token;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Keepalive ping interval.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Bearer token; WebSocket clients cannot set headers so it rides in
    /// the query string.
    pub token: String,
}

/// Message sent by the client over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum ClientMessage {
    Join {
        #[serde(rename = "videoId")]
        video_id: String,
    },
    Leave {
        #[serde(rename = "videoId")]
        video_id: String,
    },
}

/// GET /ws
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    verify_token(&params.token, &state.config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid WebSocket token"))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

/// The set of rooms one socket is joined to.
///
/// Each joined room runs a small forwarder task draining that room's
/// broadcast receiver into the socket's single mpsc funnel, so the socket
/// loop selects on one channel no matter how many rooms are joined.
/// Forwarders are aborted on leave and when the set drops.
struct RoomSet {
    events: Arc<EventBroadcaster>,
    tx: mpsc::UnboundedSender<WsEvent>,
    forwarders: HashMap<String, JoinHandle<()>>,
}

impl RoomSet {
    fn new(events: Arc<EventBroadcaster>, tx: mpsc::UnboundedSender<WsEvent>) -> Self {
        Self {
            events,
            tx,
            forwarders: HashMap::new(),
        }
    }

    /// Join a room. Joining a room twice is a no-op.
    fn join(&mut self, video_id: &str) {
        if self.forwarders.contains_key(video_id) {
            return;
        }

        let mut room_rx = self.events.subscribe(video_id);
        let tx = self.tx.clone();
        let id = video_id.to_string();
        let forwarder = tokio::spawn(async move {
            loop {
                match room_rx.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(video_id = %id, skipped, "Room subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.forwarders.insert(video_id.to_string(), forwarder);
    }

    /// Leave a room. Leaving a room that was never joined is a no-op.
    fn leave(&mut self, video_id: &str) {
        if let Some(forwarder) = self.forwarders.remove(video_id) {
            forwarder.abort();
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.forwarders.len()
    }
}

impl Drop for RoomSet {
    fn drop(&mut self) {
        for forwarder in self.forwarders.values() {
            forwarder.abort();
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut global_rx = state.events.subscribe_global();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut rooms = RoomSet::new(state.events.clone(), event_tx);
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Join { video_id }) => {
                                debug!(video_id = %video_id, "Client joined room");
                                rooms.join(&video_id);
                            }
                            Ok(ClientMessage::Leave { video_id }) => {
                                debug!(video_id = %video_id, "Client left room");
                                rooms.leave(&video_id);
                            }
                            Err(e) => {
                                debug!(error = %e, "Ignoring unparsable client message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }

            event = event_rx.recv() => {
                // RoomSet holds the sender, so None cannot occur while the
                // loop runs; treat it as a closed socket anyway.
                let Some(event) = event else { break };
                if forward(&mut socket, &event).await.is_err() {
                    break;
                }
            }

            event = global_rx.recv() => {
                match event {
                    Ok(event) => {
                        if forward(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Global subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            _ = heartbeat.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("WebSocket closed");
}

async fn forward(socket: &mut WebSocket, event: &WsEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize event");
            return Ok(());
        }
    };
    socket.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;
    use vguard_models::VideoStatus;

    #[test]
    fn test_client_message_join() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"join","videoId":"vid-1"}"#).unwrap();
        match msg {
            ClientMessage::Join { video_id } => assert_eq!(video_id, "vid-1"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_client_message_leave() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"leave","videoId":"vid-1"}"#).unwrap();
        match msg {
            ClientMessage::Leave { video_id } => assert_eq!(video_id, "vid-1"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"subscribe"}"#).is_err());
    }

    fn room_set() -> (
        Arc<EventBroadcaster>,
        RoomSet,
        mpsc::UnboundedReceiver<WsEvent>,
    ) {
        let events = Arc::new(EventBroadcaster::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let rooms = RoomSet::new(events.clone(), tx);
        (events, rooms, rx)
    }

    #[tokio::test]
    async fn test_all_joined_rooms_deliver() {
        let (events, mut rooms, mut rx) = room_set();
        rooms.join("vid-a");
        rooms.join("vid-b");

        events.publish(WsEvent::processing_complete("vid-a", VideoStatus::Safe));
        events.publish(WsEvent::processing_complete("vid-b", VideoStatus::Flagged));

        let mut seen = Vec::new();
        for _ in 0..2 {
            let event = timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("event not forwarded")
                .unwrap();
            seen.push(event.video_id().to_string());
        }
        seen.sort();
        assert_eq!(seen, vec!["vid-a", "vid-b"]);
    }

    #[tokio::test]
    async fn test_rejoin_does_not_duplicate_events() {
        let (events, mut rooms, mut rx) = room_set();
        rooms.join("vid-a");
        rooms.join("vid-a");
        assert_eq!(rooms.len(), 1);

        events.publish(WsEvent::processing_complete("vid-a", VideoStatus::Safe));

        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event not forwarded")
            .unwrap();
        assert!(
            timeout(Duration::from_millis(100), rx.recv()).await.is_err(),
            "one publish must yield one forwarded event"
        );
    }

    #[tokio::test]
    async fn test_leave_stops_delivery_for_that_room_only() {
        let (events, mut rooms, mut rx) = room_set();
        rooms.join("vid-a");
        rooms.join("vid-b");

        rooms.leave("vid-a");
        assert_eq!(rooms.len(), 1);
        // Let the aborted forwarder wind down before publishing.
        tokio::time::sleep(Duration::from_millis(50)).await;

        events.publish(WsEvent::processing_complete("vid-a", VideoStatus::Safe));
        events.publish(WsEvent::processing_complete("vid-b", VideoStatus::Safe));

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("remaining room must still deliver")
            .unwrap();
        assert_eq!(event.video_id(), "vid-b");
        assert!(
            timeout(Duration::from_millis(100), rx.recv()).await.is_err(),
            "left room must not deliver"
        );
    }
}
