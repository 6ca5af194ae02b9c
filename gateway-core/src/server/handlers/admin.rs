//! CRUD endpoints for sources and response mappings.
//!
//! POST   /sources        - create a source
//! GET    /sources        - list sources
//! GET    /sources/:id    - fetch one source
//! DELETE /sources/:id    - remove a source
//!
//! `/responses` mirrors the same shape for response mappings.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::error::{GatewayError, Result};
use crate::ids;
use crate::server::AppState;
use crate::storage::{NewResponseMapping, NewSource, ResponseMapping, Source};

pub async fn create_source(
    State(state): State<AppState>,
    Json(mut new): Json<NewSource>,
) -> Result<impl IntoResponse> {
    if let Some(response_id) = &new.response_id {
        let normalized = ids::normalize(response_id).ok_or_else(|| {
            GatewayError::InvalidInput(format!("'{}' is not a valid response id", response_id))
        })?;
        new.response_id = Some(normalized);
    }

    let source = Source::from(new);
    state.sources.create(&source).await?;
    info!(id = %source.id, name = %source.name, "source created");
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>> {
    Ok(Json(state.sources.list().await?))
}

pub async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>> {
    Ok(Json(state.sources.get_by_id(&id).await?))
}

pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.sources.delete(&id).await?;
    info!(id = %id, "source deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_response(
    State(state): State<AppState>,
    Json(new): Json<NewResponseMapping>,
) -> Result<impl IntoResponse> {
    let response = ResponseMapping::from(new);
    state.responses.create(&response).await?;
    info!(id = %response.id, name = %response.name, "response mapping created");
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_responses(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResponseMapping>>> {
    Ok(Json(state.responses.list().await?))
}

pub async fn get_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResponseMapping>> {
    state
        .responses
        .get_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("response '{}'", id)))
}

pub async fn delete_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.responses.delete(&id).await?;
    info!(id = %id, "response mapping deleted");
    Ok(StatusCode::NO_CONTENT)
}
