//! Translation of an inbound request into outbound request descriptors.

pub mod template;

pub use template::TemplateMapper;

use async_trait::async_trait;

use crate::dispatch::OutboundRequest;
use crate::error::Result;
use crate::pipeline::{ErrorSet, RequestContext};
use crate::storage::Source;

/// Descriptors produced for one inbound request, plus anything that could
/// not be mapped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapOutput {
    pub requests: Vec<OutboundRequest>,
    pub errors: ErrorSet,
}

/// Produces outbound requests from a source configuration.
///
/// Partial problems belong in [`MapOutput::errors`]; returning `Err` fails
/// the whole request.
#[async_trait]
pub trait Mapper: Send + Sync {
    async fn map(&self, source: &Source, context: &RequestContext) -> Result<MapOutput>;
}
