use std::sync::Arc;

use crate::dispatch::Dispatcher;
use crate::mapper::TemplateMapper;
use crate::observability::MetricsCollector;
use crate::pipeline::Orchestrator;
use crate::storage::{ResponseRepository, SourceRepository};
use crate::transform::TemplateTransformer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub sources: Arc<dyn SourceRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub metrics: MetricsCollector,
}

impl AppState {
    /// Wires the template mapper and transformer around the given stores and
    /// dispatcher.
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        responses: Arc<dyn ResponseRepository>,
        dispatcher: Arc<dyn Dispatcher>,
        metrics: MetricsCollector,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            sources.clone(),
            responses.clone(),
            Arc::new(TemplateMapper::new()),
            dispatcher,
            Arc::new(TemplateTransformer::new()),
        )
        .with_metrics(metrics.clone());

        Self {
            orchestrator: Arc::new(orchestrator),
            sources,
            responses,
            metrics,
        }
    }
}
