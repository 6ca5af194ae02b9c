use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::Error as ReqwestError;
use serde_json::json;
use serde_json::Error as JsonError;
use sqlx::Error as SqlxError;
use std::io::Error as IoError;
use thiserror::Error;

use crate::migrations::MigrationError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Storage error: {0}")]
    Storage(#[from] SqlxError),

    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GatewayError {
    /// Maps a sqlx error to `Conflict` when it is a unique constraint violation.
    pub fn from_write(err: SqlxError, what: &str) -> Self {
        match &err {
            SqlxError::Database(db) if db.is_unique_violation() => {
                GatewayError::Conflict(what.to_string())
            }
            _ => GatewayError::Storage(err),
        }
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(err: anyhow::Error) -> Self {
        GatewayError::Unknown(err.to_string())
    }
}

impl From<minijinja::Error> for GatewayError {
    fn from(err: minijinja::Error) -> Self {
        GatewayError::Template(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatewayError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            GatewayError::InvalidInput(_) | GatewayError::Serialization(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
