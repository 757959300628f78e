//! HTTP server facade for Lectern with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{extract::Request, http::HeaderValue, routing::get, Router};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::{Timestamp, Uuid};

use lectern_kernel::{AppState, ModuleRegistry};

pub mod error;
pub mod router;

pub use error::AppError;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry
pub async fn start_server(registry: &ModuleRegistry, state: AppState) -> anyhow::Result<()> {
    let host = state.settings.server.host.clone();
    let port = state.settings.server.port;

    tracing::info!("starting HTTP server on {}:{}", host, port);

    let app = build_router(registry, state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .context("failed to bind to address")?;

    tracing::info!("HTTP server listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the main HTTP router with all module routes mounted under
/// `/catalog`, the global middleware stack, and the merged OpenAPI docs.
pub fn build_router(registry: &ModuleRegistry, state: AppState) -> Router {
    let timeout_ms = state.settings.server.request_timeout_ms;

    RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(timeout_ms)
        .route("/healthz", get(health_check))
        .mount_catalog(registry)
        .with_openapi(registry)
        .build(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Request ID generator for tracing
#[derive(Clone)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}
