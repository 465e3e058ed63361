//! Feedback Lens HTTP API
//!
//! Axum-based HTTP server in front of the [`FeedbackIngestor`].
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - GET  /health — store reachability
//! - any other method or path — feedback ingestion (only POST is accepted)

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use lens_core::config::HttpConfig;
use lens_core::FeedbackStore;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::subsystems::{FeedbackIngestor, IngestError};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub ingestor: Arc<FeedbackIngestor>,
    pub max_body_bytes: usize,
}

/// Build the Axum router. Everything except `GET /health` reaches the feedback handler.
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler).fallback(feedback_handler))
        .fallback(feedback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    ingestor: Arc<FeedbackIngestor>,
    config: &HttpConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(HttpState {
        ingestor,
        max_body_bytes: config.max_body_bytes,
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Feedback Lens HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

/// Inner health check — asks the store for its version.
pub async fn health_inner(store: &dyn FeedbackStore) -> (StatusCode, serde_json::Value) {
    match store.health().await {
        Ok(database) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "database": database,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner feedback — rejects non-POST before touching the body, then hands off.
pub async fn feedback_inner(
    ingestor: &FeedbackIngestor,
    max_body_bytes: usize,
    request: Request,
) -> (StatusCode, serde_json::Value) {
    let (parts, body) = request.into_parts();

    if parts.method != Method::POST {
        return ingestor.handle(&parts.method, &[]).await;
    }

    let bytes: Bytes = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read request body");
            return IngestError::Processing(e.to_string()).into_http();
        }
    };

    ingestor.handle(&parts.method, &bytes).await
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.ingestor.store().as_ref()).await;
    (status, Json(body))
}

pub async fn feedback_handler(
    State(state): State<Arc<HttpState>>,
    request: Request,
) -> impl IntoResponse {
    let (status, body) = feedback_inner(&state.ingestor, state.max_body_bytes, request).await;
    (status, Json(body))
}
