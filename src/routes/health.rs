//! Health check endpoint
//!
//! `/health` and `/healthz` return 200 while the process is serving, along
//! with a summary of the shared document and connected observers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::inspection::OverallStatus;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    /// Connected push-channel observers
    pub observers: usize,
    pub items: usize,
    pub overall_status: OverallStatus,
}

/// Liveness probe
pub async fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let doc = state.document.snapshot().await;
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        observers: state.hub.observer_count(),
        items: doc.items.len(),
        overall_status: doc.overall_status,
    };
    json_response(StatusCode::OK, &response)
}
