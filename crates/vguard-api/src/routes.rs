//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::header::HeaderValue;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    delete_video, get_video, health, increment_views, list_videos, ready, start_analysis,
    stream_video, update_video_title, upload_video,
};
use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/videos/upload", post(upload_video))
        // Uploads carry whole video files; everything else keeps the axum
        // default body limit.
        .layer(DefaultBodyLimit::max(state.config.max_upload_size));

    let video_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video).delete(delete_video))
        .route("/videos/:video_id/stream", get(stream_video))
        .route("/videos/:video_id/analysis/start", post(start_analysis))
        .route("/videos/:video_id/view", patch(increment_views))
        .route("/videos/:video_id/title", patch(update_video_title));

    let api_routes = Router::new().merge(upload_routes).merge(video_routes);

    let ws_routes = Router::new().route("/ws", get(ws_handler));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// CORS layer from the configured origins; `*` means any.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
