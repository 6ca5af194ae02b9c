//! Execution of outbound request descriptors.

pub mod http;

pub use http::HttpDispatcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::storage::Source;

/// One outbound call produced by a mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
        }
    }
}

/// Outcome of a single outbound call. A transport failure is an outcome
/// too, it never fails the whole dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchResult {
    Response {
        status: u16,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Value,
    },
    Failed {
        error: String,
    },
}

impl DispatchResult {
    pub fn response(status: u16, body: Value) -> Self {
        DispatchResult::Response {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        DispatchResult::Failed {
            error: error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DispatchResult::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Parallel,
    Serial,
}

impl DispatchMode {
    pub fn for_source(source: &Source) -> Self {
        if source.serial {
            DispatchMode::Serial
        } else {
            DispatchMode::Parallel
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Parallel => "parallel",
            DispatchMode::Serial => "serial",
        }
    }
}

/// Runs descriptors and returns one result per descriptor, in descriptor
/// order, whatever the mode.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        requests: Vec<OutboundRequest>,
        mode: DispatchMode,
    ) -> Result<Vec<DispatchResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_shapes() {
        let ok = DispatchResult::response(204, Value::Null);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "status": 204, "headers": {}, "body": null })
        );

        let failed = DispatchResult::failed("connection refused");
        assert!(failed.is_failure());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "error": "connection refused" })
        );
    }

    #[test]
    fn test_mode_from_source() {
        let mut source = Source::new("s", json!({}));
        assert_eq!(DispatchMode::for_source(&source), DispatchMode::Parallel);
        source.serial = true;
        assert_eq!(DispatchMode::for_source(&source), DispatchMode::Serial);
    }
}
