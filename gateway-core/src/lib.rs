pub mod config;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod mapper;
pub mod migrations;
pub mod observability;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod template;
pub mod transform;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use pipeline::{ErrorKind, ErrorSet, Orchestrator, Reply, RequestContext};
pub use server::{build_router, AppState};
