//! Persisted gateway configuration: sources and response mappings.

pub mod db;
pub mod memory;
pub mod responses;
pub mod sources;

pub use db::Database;
pub use memory::{MemoryResponseStore, MemorySourceStore};
pub use responses::SqliteResponseStore;
pub use sources::SqliteSourceStore;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::ids;

/// How requests for one gateway endpoint are mapped and dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub serial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    pub mapping: Value,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: impl Into<String>, mapping: Value) -> Self {
        Self {
            id: ids::generate(),
            name: name.into(),
            serial: false,
            response_id: None,
            mapping,
            created_at: Utc::now(),
        }
    }

    pub fn serial(mut self, serial: bool) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_response(mut self, response_id: impl Into<String>) -> Self {
        self.response_id = Some(response_id.into());
        self
    }
}

/// Request body for creating a source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSource {
    pub name: String,
    #[serde(default)]
    pub serial: bool,
    #[serde(default)]
    pub response_id: Option<String>,
    pub mapping: Value,
}

impl From<NewSource> for Source {
    fn from(new: NewSource) -> Self {
        let source = Source::new(new.name, new.mapping).serial(new.serial);
        match new.response_id {
            Some(response_id) => source.with_response(response_id),
            None => source,
        }
    }
}

/// How dispatch results are rendered into the final reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    pub id: String,
    pub name: String,
    pub template: Value,
    pub created_at: DateTime<Utc>,
}

impl ResponseMapping {
    pub fn new(name: impl Into<String>, template: Value) -> Self {
        Self {
            id: ids::generate(),
            name: name.into(),
            template,
            created_at: Utc::now(),
        }
    }
}

/// Request body for creating a response mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct NewResponseMapping {
    pub name: String,
    pub template: Value,
}

impl From<NewResponseMapping> for ResponseMapping {
    fn from(new: NewResponseMapping) -> Self {
        ResponseMapping::new(new.name, new.template)
    }
}

#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Insert a source. Names are unique.
    async fn create(&self, source: &Source) -> Result<()>;

    /// Fetch a source. A missing record is an error.
    async fn get_by_id(&self, id: &str) -> Result<Source>;

    async fn list(&self) -> Result<Vec<Source>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Insert a response mapping. Names are unique.
    async fn create(&self, response: &ResponseMapping) -> Result<()>;

    /// Fetch a response mapping. A missing record is `Ok(None)`.
    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseMapping>>;

    async fn list(&self) -> Result<Vec<ResponseMapping>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

pub(crate) fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(crate::error::GatewayError::InvalidInput(
            "name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates `id` and returns its canonical form.
pub(crate) fn check_id(id: &str) -> Result<String> {
    ids::normalize(id).ok_or_else(|| {
        crate::error::GatewayError::InvalidInput(format!("'{}' is not a valid id", id))
    })
}
