use crate::constants::token_purpose;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::{require_token, ApiResponse};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use stashlink_storage::SweepReport;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SweepRequest {
    /// Token issued for `manual_cleanup`
    pub nonce: String,
}

/// Sweep expired upload sessions now
#[utoipa::path(
    post,
    path = "/api/v0/maintenance/sweep",
    tag = "maintenance",
    request_body = SweepRequest,
    responses(
        (status = 200, description = "Sweep diagnostics", body = ApiResponse<SweepReport>),
        (status = 401, description = "No verified session", body = ErrorResponse),
        (status = 403, description = "Invalid cleanup token", body = ErrorResponse)
    )
)]
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SweepRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_token(&state, token_purpose::MANUAL_CLEANUP, Some(&request.nonce))?;

    let report = state.sweeper.run_once().await?;
    let message = format!(
        "Removed {} of {} scratch entries older than {}s",
        report.removed,
        report.entries.len(),
        report.max_age_secs
    );

    Ok(Json(ApiResponse::with_message(message, report)))
}
