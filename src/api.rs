//! HTTP server for health, metrics, and status endpoints.
//!
//! Observability surface only; the product API (checkpoint/deposit/redeem
//! routes) lives in a separate gateway that consumes the service facade.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;

use crate::ledger::{Ledger, LedgerCounts};
use crate::metrics;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub started: Instant,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: u64,
    counts: LedgerCounts,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(serve_metrics))
        .route("/status", get(status))
        .with_state(state)
}

/// Start the API server; runs until the listener fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server started");
    metrics::UP.set(1.0);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn serve_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let _ = encoder.encode(&metric_families, &mut buffer);
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: state.started.elapsed().as_secs(),
        counts: state.ledger.counts(),
    })
}
