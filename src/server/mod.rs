//! HTTP entry point.
//!
//! Exposes `POST /aggregate` plus a few small endpoints. Each aggregation
//! request gets its own [`Task`](crate::aggregation::Task); the handler
//! waits on the task's sink, bounded by the optional overall deadline.

pub mod handlers;

use crate::aggregation::Aggregator;
use crate::error::ApiError;
use crate::models::AggregateResponse;
use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state of the HTTP service.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub max_urls: usize,
    pub deadline: Option<Duration>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/aggregate", post(handlers::aggregate))
        .route("/time/basic", get(handlers::time_basic))
        .route("/time/re", get(handlers::time_re))
        .route("/time/callable", get(handlers::time_callable))
        .route("/time/deferred", get(handlers::time_deferred))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Wait for an aggregation result, optionally bounded by `deadline`.
///
/// Requests still in flight when the deadline passes keep running; their
/// results are discarded.
pub async fn wait_for(
    rx: oneshot::Receiver<AggregateResponse>,
    deadline: Option<Duration>,
) -> Result<AggregateResponse, ApiError> {
    let outcome = match deadline {
        Some(limit) => tokio::time::timeout(limit, rx)
            .await
            .map_err(|_| ApiError::DeadlineExceeded(limit))?,
        None => rx.await,
    };

    outcome.map_err(|_| ApiError::Abandoned)
}
