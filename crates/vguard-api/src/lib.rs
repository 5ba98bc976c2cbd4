//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload with MIME and size validation
//! - Byte-range video streaming
//! - Analysis pipeline control with duplicate-run suppression
//! - WebSocket progress channel with per-video rooms

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
