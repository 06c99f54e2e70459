use crate::constants::token_purpose;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use stashlink_core::AppError;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct TokenQuery {
    /// `upload_chunk` (default), `manual_cleanup` or `delete_file`
    pub purpose: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedToken {
    pub token: String,
    pub purpose: String,
    pub expires_in_secs: u64,
}

/// Issue an upload token
#[utoipa::path(
    get,
    path = "/api/v0/uploads/token",
    tag = "uploads",
    params(TokenQuery),
    responses(
        (status = 200, description = "Token issued", body = ApiResponse<IssuedToken>),
        (status = 400, description = "Unknown purpose", body = ErrorResponse),
        (status = 401, description = "No verified session", body = ErrorResponse)
    )
)]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let purpose = query
        .purpose
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(token_purpose::UPLOAD_CHUNK);

    if !token_purpose::ALL.contains(&purpose) {
        return Err(AppError::InvalidInput(format!("Unknown token purpose: {}", purpose)).into());
    }

    let token = state.tokens.issue(purpose)?;

    Ok(Json(ApiResponse::data(IssuedToken {
        token,
        purpose: purpose.to_string(),
        expires_in_secs: state.config.token_ttl_secs,
    })))
}
