use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::{MapOutput, Mapper};
use crate::dispatch::OutboundRequest;
use crate::error::{GatewayError, Result};
use crate::pipeline::{ErrorSet, RequestContext};
use crate::storage::Source;
use crate::template::TemplateEngine;

/// Error kind recorded for request templates that failed to render.
pub const REQUEST_MAPPING_ERROR: &str = "REQUEST_MAPPING_ERROR";

/// Maps requests by rendering the source mapping as request templates.
///
/// The mapping is one request template or an array of them. Each template
/// is an object with `url` (required), `method`, `headers`, `query` and
/// `body`, rendered against the request context.
pub struct TemplateMapper {
    engine: TemplateEngine,
}

impl TemplateMapper {
    pub fn new() -> Self {
        Self {
            engine: TemplateEngine::new(),
        }
    }

    fn render_request(
        &self,
        template: &Value,
        context: &RequestContext,
        ctx: &minijinja::Value,
    ) -> Result<OutboundRequest> {
        let Value::Object(fields) = self.engine.render_value(template, ctx)? else {
            return Err(GatewayError::InvalidInput(
                "request template must be an object".to_string(),
            ));
        };

        let url = match fields.get("url") {
            Some(Value::String(url)) if !url.is_empty() => url.clone(),
            _ => {
                return Err(GatewayError::InvalidInput(
                    "request template needs a non-empty 'url'".to_string(),
                ))
            }
        };

        let method = match fields.get("method") {
            None | Some(Value::Null) => context.method.clone(),
            Some(Value::String(method)) => method.clone(),
            Some(other) => {
                return Err(GatewayError::InvalidInput(format!(
                    "'method' must be a string, got {}",
                    other
                )))
            }
        };

        Ok(OutboundRequest {
            method,
            url,
            headers: string_map(fields.get("headers"), "headers")?,
            query: string_map(fields.get("query"), "query")?,
            body: fields.get("body").filter(|body| !body.is_null()).cloned(),
        })
    }
}

impl Default for TemplateMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mapper for TemplateMapper {
    async fn map(&self, source: &Source, context: &RequestContext) -> Result<MapOutput> {
        let templates: Vec<&Value> = match &source.mapping {
            Value::Array(items) => items.iter().collect(),
            mapping @ Value::Object(_) => vec![mapping],
            _ => {
                return Err(GatewayError::InvalidConfig(format!(
                    "mapping of source '{}' must be an object or an array",
                    source.name
                )))
            }
        };

        let ctx = TemplateEngine::context(context);
        let mut requests = Vec::with_capacity(templates.len());
        let mut failures = Vec::new();

        for (index, template) in templates.into_iter().enumerate() {
            match self.render_request(template, context, &ctx) {
                Ok(request) => requests.push(request),
                Err(e) => {
                    warn!(source = %source.name, index, error = %e, "skipping unmappable request");
                    failures.push(json!({ "index": index, "message": e.to_string() }));
                }
            }
        }

        let errors = if failures.is_empty() {
            ErrorSet::new()
        } else {
            ErrorSet::new().with(REQUEST_MAPPING_ERROR, Value::Array(failures))
        };

        Ok(MapOutput { requests, errors })
    }
}

/// Flattens a rendered object into string values. Nulls are dropped.
fn string_map(value: Option<&Value>, field: &str) -> Result<BTreeMap<String, String>> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => Ok(entries
            .iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(text) => Some((key.clone(), text.clone())),
                other => Some((key.clone(), other.to_string())),
            })
            .collect()),
        Some(other) => Err(GatewayError::InvalidInput(format!(
            "'{}' must be an object, got {}",
            field, other
        ))),
    }
}
