//! Chunk and finish handlers.
//!
//! The browser slices a file, posts each slice as multipart form data under a
//! client-chosen `upload_id`, then calls finish once every slice is stored.
//! Both calls need a verified session (route middleware) and an
//! `upload_chunk` token.

use crate::constants::{chunk_field, token_purpose};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::{require_token, ApiResponse};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use stashlink_core::{AppError, ChunkReceipt, FinishUploadRequest, FinishUploadResponse, StorageBackend};
use std::sync::Arc;
use validator::Validate;

/// Every field of one chunk request, read before anything is checked or written.
#[derive(Default)]
struct ChunkForm {
    upload_id: Option<String>,
    chunk_index: Option<String>,
    nonce: Option<String>,
    data: Option<Bytes>,
}

async fn read_chunk_form(mut multipart: Multipart) -> Result<ChunkForm, AppError> {
    let mut form = ChunkForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Integrity(format!("Malformed chunk request: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            chunk_field::FILE_CHUNK => {
                let data = field.bytes().await.map_err(|e| {
                    AppError::Integrity(format!("Failed to read chunk data: {}", e))
                })?;
                form.data = Some(data);
            }
            chunk_field::UPLOAD_ID | chunk_field::CHUNK_INDEX | chunk_field::NONCE => {
                let value = field.text().await.map_err(|e| {
                    AppError::Integrity(format!("Failed to read field {}: {}", name, e))
                })?;
                match name.as_str() {
                    chunk_field::UPLOAD_ID => form.upload_id = Some(value),
                    chunk_field::CHUNK_INDEX => form.chunk_index = Some(value),
                    _ => form.nonce = Some(value),
                }
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Store one chunk
#[utoipa::path(
    post,
    path = "/api/v0/uploads/chunk",
    tag = "uploads",
    request_body(content_type = "multipart/form-data", description = "Fields: upload_id, chunk_index, nonce, file_chunk"),
    responses(
        (status = 200, description = "Chunk stored", body = ApiResponse<ChunkReceipt>),
        (status = 401, description = "No verified session", body = ErrorResponse),
        (status = 403, description = "Invalid upload token", body = ErrorResponse),
        (status = 422, description = "Missing or unreadable chunk data", body = ErrorResponse),
        (status = 502, description = "Chunk could not be written", body = ErrorResponse)
    )
)]
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_chunk_form(multipart).await?;

    require_token(&state, token_purpose::UPLOAD_CHUNK, form.nonce.as_deref())?;

    let upload_id = form
        .upload_id
        .ok_or_else(|| AppError::InvalidInput("upload_id is required".to_string()))?;
    let chunk_index: u32 = form
        .chunk_index
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| AppError::Integrity("chunk_index is required".to_string()))?
        .parse()
        .map_err(|_| AppError::Integrity("chunk_index must be a non-negative integer".to_string()))?;
    let data = form
        .data
        .ok_or_else(|| AppError::Integrity(format!("No chunk data received for chunk {}", chunk_index)))?;

    let receipt = state.uploads.receive_chunk(&upload_id, chunk_index, &data).await?;

    Ok(Json(ApiResponse::with_message(
        format!("Chunk {} uploaded", chunk_index),
        receipt,
    )))
}

/// Assemble, publish and shorten an upload
#[utoipa::path(
    post,
    path = "/api/v0/uploads/finish",
    tag = "uploads",
    request_body = FinishUploadRequest,
    responses(
        (status = 200, description = "File published and shortened", body = ApiResponse<FinishUploadResponse>),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "No verified session", body = ErrorResponse),
        (status = 403, description = "Invalid upload token", body = ErrorResponse),
        (status = 422, description = "Chunks missing or incomplete", body = ErrorResponse),
        (status = 502, description = "Publish or short link failed", body = ErrorResponse),
        (status = 503, description = "Storage backend not configured", body = ErrorResponse)
    )
)]
pub async fn finish_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FinishUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_token(&state, token_purpose::UPLOAD_CHUNK, Some(&request.nonce))?;
    request.validate()?;

    let response = state.uploads.finish(&request).await?;

    let target = match response.backend {
        StorageBackend::S3 => "S3",
        StorageBackend::Local => "Server",
    };
    let message = format!(
        "\"{}\" successfully sent to {}. Direct: {} Short: {}",
        response.file_name, target, response.url, response.short_url
    );

    Ok(Json(ApiResponse::with_message(message, response)))
}
