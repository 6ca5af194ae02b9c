//! JSON templates rendered with minijinja.
//!
//! A template is any JSON value. Strings inside it are jinja templates;
//! objects, arrays and scalars are walked and copied. A string consisting of
//! exactly one `{{ expr }}` block is evaluated as an expression so that the
//! result keeps its JSON type (numbers, objects, arrays) instead of being
//! stringified.

use minijinja::Environment;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Converts any serializable context into a template context.
    pub fn context<S: Serialize>(ctx: &S) -> minijinja::Value {
        minijinja::Value::from_serialize(ctx)
    }

    pub fn render_value(&self, template: &Value, ctx: &minijinja::Value) -> Result<Value> {
        match template {
            Value::String(source) => self.render_string(source, ctx),
            Value::Array(items) => items
                .iter()
                .map(|item| self.render_value(item, ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(fields) => {
                let mut rendered = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    rendered.insert(key.clone(), self.render_value(value, ctx)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }

    pub fn render_string(&self, source: &str, ctx: &minijinja::Value) -> Result<Value> {
        if let Some(expr) = single_expression(source) {
            let expression = self.env.compile_expression(expr)?;
            let value = expression.eval(ctx)?;
            return Ok(serde_json::to_value(&value)?);
        }

        if !source.contains("{{") && !source.contains("{%") {
            return Ok(Value::String(source.to_string()));
        }

        Ok(Value::String(self.env.render_str(source, ctx)?))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the inner expression when `source` is a lone `{{ ... }}` block.
fn single_expression(source: &str) -> Option<&str> {
    let trimmed = source.trim();
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
        return None;
    }
    let inner = inner.trim_start_matches('-').trim_end_matches('-').trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}
