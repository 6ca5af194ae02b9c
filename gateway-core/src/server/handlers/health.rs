use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde_json::json;

use crate::error::Result;
use crate::server::AppState;

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state.metrics.export()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
