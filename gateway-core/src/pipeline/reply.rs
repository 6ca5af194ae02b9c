use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::context::RequestContext;
use super::errors::{ErrorKind, ErrorSet};
use crate::dispatch::DispatchResult;
use crate::transform::TransformedResponse;

/// Untransformed delivery of the dispatch results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub source_id: String,
    pub context: RequestContext,
    pub delivered: Vec<DispatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(flatten)]
    pub errors: ErrorSet,
}

/// A fatal pipeline outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub error: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    pub details: Value,
}

/// Terminal result of one pass through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Delivered(Envelope),
    Transformed(TransformedResponse),
    Failed(Failure),
}

impl Reply {
    pub fn failed(
        kind: ErrorKind,
        source_id: Option<&str>,
        context: Option<RequestContext>,
        details: impl Into<Value>,
    ) -> Self {
        Reply::Failed(Failure {
            error: kind,
            source_id: source_id.map(str::to_string),
            context,
            details: details.into(),
        })
    }

    pub fn status(&self) -> u16 {
        match self {
            Reply::Delivered(_) => 200,
            Reply::Transformed(transformed) => transformed.status,
            Reply::Failed(_) => 400,
        }
    }

    /// Label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            Reply::Delivered(_) => "delivered",
            Reply::Transformed(_) => "transformed",
            Reply::Failed(failure) => failure.error.as_str(),
        }
    }

    /// Accumulated errors carried by a delivered envelope.
    pub fn errors(&self) -> Option<&ErrorSet> {
        match self {
            Reply::Delivered(envelope) => Some(&envelope.errors),
            _ => None,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Delivered(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
            Reply::Failed(failure) => (StatusCode::BAD_REQUEST, Json(failure)).into_response(),
            Reply::Transformed(transformed) => transformed_response(transformed),
        }
    }
}

fn transformed_response(transformed: TransformedResponse) -> Response {
    let status =
        StatusCode::from_u16(transformed.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = match transformed.body {
        Value::Null => ().into_response(),
        Value::String(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
        other => Json(other).into_response(),
    };
    *response.status_mut() = status;

    for (name, value) in &transformed.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), _) if is_framing_header(&name) => {
                tracing::warn!(header = %name, "dropping framing header from transformed reply");
            }
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid transformed header"),
        }
    }

    response
}

/// Headers owned by the connection layer. The server computes these itself.
fn is_framing_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "content-length"
            | "transfer-encoding"
            | "connection"
            | "keep-alive"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "upgrade"
    )
}
