//! HTTP surface of the gateway.
//!
//! | Method | Path | |
//! |--------|------|-|
//! | any of GET, POST, PUT, PATCH, DELETE | `/mappers/:source_id` | run the pipeline |
//! | `GET` | `/health` | liveness |
//! | `GET` | `/metrics` | Prometheus text |
//! | | `/sources`, `/responses` | admin CRUD |

pub mod handlers;
pub mod state;

pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use handlers::{admin, health, mappers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mappers/:source_id",
            get(mappers::handle)
                .post(mappers::handle)
                .put(mappers::handle)
                .patch(mappers::handle)
                .delete(mappers::handle),
        )
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route(
            "/sources",
            post(admin::create_source).get(admin::list_sources),
        )
        .route(
            "/sources/:id",
            get(admin::get_source).delete(admin::delete_source),
        )
        .route(
            "/responses",
            post(admin::create_response).get(admin::list_responses),
        )
        .route(
            "/responses/:id",
            get(admin::get_response).delete(admin::delete_response),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
