use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{DispatchMode, DispatchResult, Dispatcher, OutboundRequest};
use crate::config::DispatchConfig;
use crate::error::{GatewayError, Result};
use crate::pipeline::RequestContext;

/// Dispatches descriptors as plain HTTP calls.
pub struct HttpDispatcher {
    client: Client,
    max_concurrency: usize,
}

impl HttpDispatcher {
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            max_concurrency: config.max_concurrency,
        })
    }

    async fn send(&self, request: &OutboundRequest) -> DispatchResult {
        match self.try_send(request).await {
            Ok(result) => result,
            Err(e) => {
                debug!(url = %request.url, error = %e, "outbound request failed");
                DispatchResult::failed(e.to_string())
            }
        }
    }

    async fn try_send(&self, request: &OutboundRequest) -> Result<DispatchResult> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| GatewayError::InvalidInput(format!("invalid method '{}'", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match &request.body {
            None => builder,
            Some(Value::String(text)) => builder.body(text.clone()),
            Some(body) => builder.json(body),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = response.bytes().await?;

        debug!(url = %request.url, status, "outbound request completed");

        Ok(DispatchResult::Response {
            status,
            headers,
            body: RequestContext::body_from_bytes(&bytes),
        })
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    #[instrument(skip(self, requests), fields(count = requests.len(), mode = mode.as_str()))]
    async fn dispatch(
        &self,
        requests: Vec<OutboundRequest>,
        mode: DispatchMode,
    ) -> Result<Vec<DispatchResult>> {
        let results: Vec<DispatchResult> = match mode {
            DispatchMode::Serial => {
                let mut results = Vec::with_capacity(requests.len());
                for request in &requests {
                    results.push(self.send(request).await);
                }
                results
            }
            DispatchMode::Parallel => {
                let pending: Vec<_> = requests.iter().map(|request| self.send(request)).collect();
                if self.max_concurrency > 0 {
                    stream::iter(pending)
                        .buffered(self.max_concurrency)
                        .collect()
                        .await
                } else {
                    futures::future::join_all(pending).await
                }
            }
        };

        Ok(results)
    }
}
