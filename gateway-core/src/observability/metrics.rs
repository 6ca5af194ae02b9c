use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::DispatchMode;
use crate::error::{GatewayError, Result};
use crate::pipeline::Reply;

/// Prometheus metrics for the request pipeline. Cheap to clone; clones share
/// one registry.
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    requests: IntCounterVec,
    request_duration: Histogram,
    outbound: IntCounterVec,
    degraded: IntCounterVec,
    active_requests: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("gateway_requests_total", "Gateway requests by outcome"),
            &["outcome"],
        )?;

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "gateway_request_duration_seconds",
                "Time spent in the request pipeline",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        let outbound = IntCounterVec::new(
            Opts::new("gateway_outbound_requests_total", "Upstream requests dispatched"),
            &["mode"],
        )?;

        let degraded = IntCounterVec::new(
            Opts::new(
                "gateway_degraded_total",
                "Delivered replies that carried a non-fatal error",
            ),
            &["kind"],
        )?;

        let active_requests = Gauge::with_opts(Opts::new(
            "gateway_active_requests",
            "Requests currently in the pipeline",
        ))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(outbound.clone()))?;
        registry.register(Box::new(degraded.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests,
            request_duration,
            outbound,
            degraded,
            active_requests,
        })
    }

    pub fn record_reply(&self, reply: &Reply, elapsed: Duration) {
        self.requests.with_label_values(&[reply.outcome()]).inc();
        self.request_duration.observe(elapsed.as_secs_f64());

        if let Some(errors) = reply.errors() {
            for kind in errors.kinds() {
                self.degraded.with_label_values(&[kind]).inc();
            }
        }
    }

    pub fn record_outbound(&self, mode: DispatchMode, count: usize) {
        self.outbound
            .with_label_values(&[mode.as_str()])
            .inc_by(count as u64);
    }

    pub fn increment_active(&self) {
        self.active_requests.inc();
    }

    pub fn decrement_active(&self) {
        self.active_requests.dec();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| GatewayError::Unknown(e.to_string()))
    }
}
