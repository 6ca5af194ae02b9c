use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::errors::ErrorSet;
use crate::dispatch::DispatchResult;

/// The inbound request as seen by mappers and templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: String,
    pub params: Map<String, Value>,
    pub body: Value,
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    /// Builds a context from the raw request parts. Query parameters are
    /// laid over path parameters, so a query key wins on conflict.
    pub fn from_parts<P, Q>(
        method: impl Into<String>,
        path_params: P,
        query: Q,
        body: Value,
        headers: BTreeMap<String, String>,
    ) -> Self
    where
        P: IntoIterator<Item = (String, String)>,
        Q: IntoIterator<Item = (String, String)>,
    {
        let mut params = Map::new();
        for (key, value) in path_params.into_iter().chain(query) {
            params.insert(key, Value::String(value));
        }

        Self {
            method: method.into(),
            params,
            body,
            headers,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Interprets a raw body: JSON when it parses, text otherwise, `null`
    /// when empty.
    pub fn body_from_bytes(bytes: &[u8]) -> Value {
        if bytes.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Request context extended with the dispatch results and the errors
/// accumulated so far. Handed to response transformers.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseContext<'a> {
    #[serde(flatten)]
    pub request: &'a RequestContext,
    pub responses: &'a [DispatchResult],
    pub errors: &'a ErrorSet,
}

impl<'a> ResponseContext<'a> {
    pub fn new(
        request: &'a RequestContext,
        responses: &'a [DispatchResult],
        errors: &'a ErrorSet,
    ) -> Self {
        Self {
            request,
            responses,
            errors,
        }
    }
}
