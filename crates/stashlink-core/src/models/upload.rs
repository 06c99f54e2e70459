use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::constants::MAX_UPLOAD_ID_LENGTH;
use crate::error::AppError;
use crate::storage_types::StorageBackend;

/// Client-chosen upload session identifier, reduced to `[A-Za-z0-9_]`.
///
/// This is the only form of the id that may reach a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploadId(String);

impl UploadId {
    /// Strips every character outside `[A-Za-z0-9_]`. Fails when nothing is
    /// left or the result is longer than [`MAX_UPLOAD_ID_LENGTH`].
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        if cleaned.is_empty() {
            return Err(AppError::InvalidInput(
                "upload_id must contain at least one of [A-Za-z0-9_]".to_string(),
            ));
        }
        if cleaned.len() > MAX_UPLOAD_ID_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "upload_id must be at most {} characters",
                MAX_UPLOAD_ID_LENGTH
            )));
        }
        Ok(UploadId(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Request body of the finish call
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FinishUploadRequest {
    #[validate(length(min = 1, max = 512, message = "upload_id must be between 1 and 512 characters"))]
    pub upload_id: String,
    /// Original file name as declared by the browser
    #[validate(length(min = 1, max = 255, message = "file_name must be between 1 and 255 characters"))]
    pub file_name: String,
    /// Transform policy: `browser-safe`, `safe-suffix`, `randomized`, or empty to keep the name
    #[serde(default)]
    pub convert_filename: Option<String>,
    /// Optional short link keyword
    #[serde(default)]
    #[validate(length(max = 200, message = "custom_shortname must be at most 200 characters"))]
    pub custom_shortname: Option<String>,
    /// Optional short link title
    #[serde(default)]
    #[validate(length(max = 500, message = "custom_title must be at most 500 characters"))]
    pub custom_title: Option<String>,
    /// When set, exactly chunks `0..total_chunks` must be present
    #[serde(default)]
    pub total_chunks: Option<u32>,
    /// One-time token issued for `upload_chunk`
    pub nonce: String,
}

/// Result of a successful finish call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinishUploadResponse {
    pub file_name: String,
    pub url: String,
    pub short_url: String,
    pub backend: StorageBackend,
    pub size_bytes: u64,
}

/// Result of a stored chunk
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkReceipt {
    pub upload_id: String,
    pub chunk_index: u32,
    pub bytes: u64,
}
