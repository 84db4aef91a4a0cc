use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
}

async fn index() -> &'static str {
    "docqueue"
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.dispatcher.store();
    let queue_depth = match store.len().await {
        Ok(depth) => Some(depth),
        Err(e) => {
            warn!(error = %e, "Queue depth unavailable");
            None
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        queue_backend: store.backend().to_string(),
        queue_depth,
    })
}
