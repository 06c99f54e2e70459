//! File manager: list and delete published files on the active backend.

use crate::constants::token_purpose;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::{require_token, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use stashlink_core::{FilePage, ListRequest};
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Token returned as `next_page_token` by the previous page
    pub page_token: Option<String>,
    /// Page size (default 20, max 1000)
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteFileQuery {
    /// Token issued for `delete_file`
    pub nonce: Option<String>,
}

/// List published files
#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "One page of files", body = ApiResponse<FilePage>),
        (status = 401, description = "No verified session", body = ErrorResponse),
        (status = 503, description = "Storage backend not configured", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = ListRequest {
        page_token: query.page_token.filter(|t| !t.is_empty()),
        limit: query.limit,
    };
    let page = state.storage.list(&request).await?;
    Ok(Json(ApiResponse::data(page)))
}

/// Delete a published file
#[utoipa::path(
    delete,
    path = "/api/v0/files/{name}",
    tag = "files",
    params(
        ("name" = String, Path, description = "Published file name"),
        DeleteFileQuery
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Not a plain file name", body = ErrorResponse),
        (status = 403, description = "Invalid delete token", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<DeleteFileQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_token(&state, token_purpose::DELETE_FILE, query.nonce.as_deref())?;

    state.storage.delete(&name).await?;
    tracing::info!(key = %name, "Published file deleted");

    Ok(Json(ApiResponse::<()>::message(format!("{} deleted", name))))
}
