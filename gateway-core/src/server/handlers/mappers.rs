use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
};
use std::collections::{BTreeMap, HashMap};

use crate::pipeline::{Reply, RequestContext};
use crate::server::AppState;

/// Path parameter under which the source id is exposed to templates.
pub const SOURCE_ID_PARAM: &str = "sourceId";

/// `ANY /mappers/:source_id`
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    Path(source_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    let context = RequestContext::from_parts(
        method.as_str(),
        [(SOURCE_ID_PARAM.to_string(), source_id.clone())],
        query,
        RequestContext::body_from_bytes(&body),
        header_map(&headers),
    );

    state.orchestrator.handle(&source_id, context).await
}

/// Lowercased header names with their UTF-8 values. Other values are skipped.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}
