//! Piper HTTP API server (Axum).
//!
//! Provides file upload compression, artifact download, text compression
//! and health monitoring.

pub mod error;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use state::AppState;

/// Build the application router with the given state.
pub fn app_with_state(state: AppState) -> Router {
    let body_limit = state.upload.max_body_bytes;
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::compression_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
