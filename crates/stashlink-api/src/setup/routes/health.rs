//! Health check handler.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub backend: String,
    /// `"ready"` or the configuration problem of the backend
    pub storage: String,
}

/// Liveness plus a storage readiness report. Always 200: a misconfigured
/// backend is reported, not treated as a dead process.
pub(super) async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = match state.storage.check_ready().await {
        Ok(()) => "ready".to_string(),
        Err(e) => e.to_string(),
    };

    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "alive".to_string(),
            backend: state.storage.backend_type().to_string(),
            storage,
        }),
    )
}
