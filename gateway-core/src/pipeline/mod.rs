//! Per-request orchestration.
//!
//! A request walks through a fixed sequence of stages:
//!
//! 1. validate the source id (`INVALID_SOURCE_ID`, fatal)
//! 2. resolve the source (`DATABASE_ERROR`, fatal)
//! 3. map and dispatch
//! 4. reply with the delivered results when no response mapping is set
//! 5. resolve the response mapping (`INVALID_RESPONSE_ID`, non-fatal)
//! 6. transform (`TRANSFORM_RESPONSE_ERROR`, non-fatal)
//!
//! Stages 3 to 6 form one guarded region. Errors that the response stages
//! report are merged into the error set and the already dispatched results
//! are still delivered. Anything else that escapes the region, including a
//! panic in a delegate, collapses the request into a single `MAPPER_ERROR`.

pub mod context;
pub mod errors;
pub mod reply;

pub use context::{RequestContext, ResponseContext};
pub use errors::{ErrorKind, ErrorSet};
pub use reply::{Envelope, Failure, Reply};

use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::dispatch::{DispatchMode, Dispatcher};
use crate::error::Result;
use crate::ids;
use crate::mapper::{MapOutput, Mapper};
use crate::observability::MetricsCollector;
use crate::storage::{ResponseRepository, Source, SourceRepository};
use crate::transform::ResponseTransformer;

pub struct Orchestrator {
    sources: Arc<dyn SourceRepository>,
    responses: Arc<dyn ResponseRepository>,
    mapper: Arc<dyn Mapper>,
    dispatcher: Arc<dyn Dispatcher>,
    transformer: Arc<dyn ResponseTransformer>,
    metrics: Option<MetricsCollector>,
}

impl Orchestrator {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        responses: Arc<dyn ResponseRepository>,
        mapper: Arc<dyn Mapper>,
        dispatcher: Arc<dyn Dispatcher>,
        transformer: Arc<dyn ResponseTransformer>,
    ) -> Self {
        Self {
            sources,
            responses,
            mapper,
            dispatcher,
            transformer,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one request through the pipeline. Never fails: every outcome is
    /// a [`Reply`].
    #[instrument(skip(self, context), fields(method = %context.method))]
    pub async fn handle(&self, source_id: &str, context: RequestContext) -> Reply {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.increment_active();
        }

        let reply = self.run(source_id, context).await;

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.decrement_active();
            metrics.record_reply(&reply, elapsed);
        }
        info!(
            outcome = reply.outcome(),
            status = reply.status(),
            duration_ms = elapsed.as_millis() as u64,
            "request completed"
        );

        reply
    }

    async fn run(&self, raw_id: &str, context: RequestContext) -> Reply {
        let Some(source_id) = ids::normalize(raw_id) else {
            warn!("rejecting malformed source id");
            return Reply::failed(
                ErrorKind::InvalidSourceId,
                Some(raw_id),
                None,
                format!("'{}' is not a valid source id", raw_id),
            );
        };
        let source_id = source_id.as_str();

        let source = match self.sources.get_by_id(source_id).await {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "source lookup failed");
                return Reply::failed(
                    ErrorKind::DatabaseError,
                    Some(source_id),
                    Some(context),
                    e.to_string(),
                );
            }
        };

        let region = AssertUnwindSafe(self.deliver(&source, &context))
            .catch_unwind()
            .await;

        match region {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(source = %source.name, error = %e, "mapping region failed");
                Reply::failed(ErrorKind::MapperError, Some(source_id), Some(context), e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(source = %source.name, error = %message, "mapping region panicked");
                Reply::failed(ErrorKind::MapperError, Some(source_id), Some(context), message)
            }
        }
    }

    /// Stages 3 to 6. `Err` means the coarse `MAPPER_ERROR`.
    async fn deliver(&self, source: &Source, context: &RequestContext) -> Result<Reply> {
        let MapOutput { requests, errors } = self.mapper.map(source, context).await?;

        let mode = DispatchMode::for_source(source);
        if let Some(metrics) = &self.metrics {
            metrics.record_outbound(mode, requests.len());
        }
        let delivered = self.dispatcher.dispatch(requests, mode).await?;

        let mut envelope = Envelope {
            source_id: source.id.clone(),
            context: context.clone(),
            delivered,
            response_id: None,
            errors,
        };

        let Some(response_id) = source.response_id.clone() else {
            return Ok(Reply::Delivered(envelope));
        };
        envelope.response_id = Some(response_id.clone());

        let mapping = match self.responses.get_by_id(&response_id).await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => return Ok(Reply::Delivered(envelope)),
            Err(e) => {
                warn!(response_id = %response_id, error = %e, "response mapping lookup failed");
                envelope.errors = envelope
                    .errors
                    .with_kind(ErrorKind::InvalidResponseId, json!(e.to_string()));
                return Ok(Reply::Delivered(envelope));
            }
        };

        let transformed = {
            let response_context =
                ResponseContext::new(context, &envelope.delivered, &envelope.errors);
            self.transformer.transform(&response_context, &mapping).await
        };

        match transformed {
            Ok(transformed) => Ok(Reply::Transformed(transformed)),
            Err(e) => {
                warn!(response = %mapping.name, error = %e, "response transform failed");
                envelope.errors = envelope
                    .errors
                    .with_kind(ErrorKind::TransformResponseError, json!(e.to_string()));
                Ok(Reply::Delivered(envelope))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected failure".to_string()
    }
}
