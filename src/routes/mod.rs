//! HTTP Routes
//!
//! - `/` - liveness
//! - `/api/health` - health with queue depth
//! - `/get_work` - hand out the next job
//! - `/return_docs` - batch result submission (JSON body)
//! - `/return_doc` - single-file result submission (multipart)
//!
//! Anything else is a JSON 404.

pub mod health;
pub mod submissions;
pub mod work;

use axum::{extract::DefaultBodyLimit, http::Uri, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::AppState;
use crate::types::AppError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .merge(health::router())
        .merge(work::router())
        .merge(submissions::router())
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
