pub mod chunked_upload;
pub mod files;
pub mod maintenance;
pub mod token;

use crate::error::HttpAppError;
use crate::state::AppState;
use serde::Serialize;
use stashlink_core::AppError;
use utoipa::ToSchema;

/// Success envelope shared by all endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always `"success"`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Fails with `TokenMismatch` unless `token` was issued for `purpose` and is still valid.
pub(crate) fn require_token(
    state: &AppState,
    purpose: &str,
    token: Option<&str>,
) -> Result<(), HttpAppError> {
    match token {
        Some(token) if state.tokens.verify(purpose, token) => Ok(()),
        Some(_) => Err(AppError::TokenMismatch(format!(
            "Invalid or expired {} token",
            purpose
        ))
        .into()),
        None => Err(AppError::TokenMismatch(format!("Missing {} token", purpose)).into()),
    }
}
