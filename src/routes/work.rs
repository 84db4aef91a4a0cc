use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::models::AppState;
use crate::types::AppResult;

#[derive(Debug, Deserialize)]
pub struct GetWorkParams {
    pub client_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/get_work", get(get_work))
}

/// GET /get_work?client_id=... - pop the next job
async fn get_work(
    State(state): State<AppState>,
    Query(params): Query<GetWorkParams>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .dispatcher
        .get_work(params.client_id.as_deref())
        .await?;

    Ok((
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
        job.to_json(),
    ))
}
