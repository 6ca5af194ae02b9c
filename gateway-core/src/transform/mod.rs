//! Rendering of dispatch results into a final reply.

pub mod template;

pub use template::TemplateTransformer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::pipeline::ResponseContext;
use crate::storage::ResponseMapping;

/// A reply produced by a response transformer. Sent to the client as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

#[async_trait]
pub trait ResponseTransformer: Send + Sync {
    async fn transform(
        &self,
        context: &ResponseContext<'_>,
        mapping: &ResponseMapping,
    ) -> Result<TransformedResponse>;
}
