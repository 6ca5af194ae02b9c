use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{ResponseTransformer, TransformedResponse};
use crate::error::{GatewayError, Result};
use crate::pipeline::ResponseContext;
use crate::storage::ResponseMapping;
use crate::template::TemplateEngine;

/// Renders `{status, headers, body}` templates against the response context.
pub struct TemplateTransformer {
    engine: TemplateEngine,
}

impl TemplateTransformer {
    pub fn new() -> Self {
        Self {
            engine: TemplateEngine::new(),
        }
    }
}

impl Default for TemplateTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseTransformer for TemplateTransformer {
    async fn transform(
        &self,
        context: &ResponseContext<'_>,
        mapping: &ResponseMapping,
    ) -> Result<TransformedResponse> {
        let Value::Object(template) = &mapping.template else {
            return Err(GatewayError::InvalidConfig(format!(
                "template of response '{}' must be an object",
                mapping.name
            )));
        };

        let ctx = TemplateEngine::context(context);

        let status = match template.get("status") {
            None => 200,
            Some(status) => parse_status(&self.engine.render_value(status, &ctx)?)?,
        };

        let headers = match template.get("headers") {
            None => BTreeMap::new(),
            Some(headers) => parse_headers(self.engine.render_value(headers, &ctx)?)?,
        };

        let body = match template.get("body") {
            None => Value::Null,
            Some(body) => self.engine.render_value(body, &ctx)?,
        };

        Ok(TransformedResponse {
            status,
            headers,
            body,
        })
    }
}

fn parse_status(value: &Value) -> Result<u16> {
    let status = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match status {
        Some(status @ 100..=599) => Ok(status as u16),
        _ => Err(GatewayError::InvalidInput(format!(
            "status must be an HTTP status code, got {}",
            value
        ))),
    }
}

fn parse_headers(value: Value) -> Result<BTreeMap<String, String>> {
    let Value::Object(entries) = value else {
        return Err(GatewayError::InvalidInput(
            "headers must render to an object".to_string(),
        ));
    };

    entries
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => Ok((name, text)),
            other => Err(GatewayError::InvalidInput(format!(
                "header '{}' must render to a string, got {}",
                name, other
            ))),
        })
        .collect()
}
