//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use mathshorts_scheduler::WorkflowEngine;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);
    Router::new()
        .route("/api/v1/health", get(super::routes::health_check))
        .route("/api/v1/tickets/pending", get(super::routes::list_pending))
        .route("/api/v1/runs", get(super::routes::list_runs))
        // POST for API clients; GET so the action links in notification
        // emails work from a browser click.
        .route(
            "/api/v1/tickets/{id}/resolve",
            post(super::routes::resolve_ticket).get(super::routes::resolve_ticket_via_link),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(shared)
}

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway listening on http://{addr}");
    axum::serve(listener, build_router(state)).await
}
