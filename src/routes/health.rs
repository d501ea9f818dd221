//! Root and health endpoints
//!
//! `GET /` answers plaintext for frontend reachability checks;
//! `/healthz` is a JSON liveness probe that also reports whether the
//! database connection came up.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{full_body, json_response, BoxBody};
use crate::server::AppState;

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub uptime: u64,
    /// Whether the MongoDB connection was established at startup
    pub database: bool,
    pub node_id: String,
    pub timestamp: String,
}

/// GET / - plaintext reachability check
pub fn root_info() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(full_body("Backend running"))
        .unwrap()
}

/// GET /healthz - JSON liveness probe
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            uptime: state.started_at.elapsed().as_secs(),
            database: state.store.is_some(),
            node_id: state.args.node_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}
