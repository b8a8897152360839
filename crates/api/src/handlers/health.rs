//! Liveness probe.

use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET /health
///
/// Always 200 while the process is up; there is no external dependency to
/// check.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
