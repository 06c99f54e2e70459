//! Storage abstraction trait
//!
//! This module defines the Storage trait that all publish backends implement.

use crate::StorageBackend;
use async_trait::async_trait;
use stashlink_core::{AppError, FilePage, ListRequest, PublishedObject, ResolvedName};
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Chunk data missing, vanished, or not matching the declared count.
    #[error("Incomplete upload: {0}")]
    Incomplete(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => AppError::Config(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::Incomplete(msg) => AppError::Integrity(msg),
            StorageError::IoError(e) => AppError::Storage(format!("IO error: {}", e)),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Publish backend.
///
/// Implementations take ownership of the artifact on success: the local
/// backend moves it into place, the object store backend removes it after the
/// upload. On failure the artifact is left where it was.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fails with `ConfigError` when the backend cannot accept a publish.
    /// Called before any destructive step of a finish call.
    async fn check_ready(&self) -> StorageResult<()>;

    /// Publish the artifact under a name derived from `name`.
    async fn publish(&self, artifact: &Path, name: &ResolvedName) -> StorageResult<PublishedObject>;

    /// One page of published files.
    async fn list(&self, request: &ListRequest) -> StorageResult<FilePage>;

    /// Delete one published file by its bare name.
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Bare file name check shared by the backends: no separators, no dot segments.
pub(crate) fn validate_object_name(name: &str) -> StorageResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "'{}' is not a valid file name",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_name() {
        assert!(validate_object_name("report.2.txt").is_ok());
        assert!(validate_object_name("draft..final.txt").is_ok());
        assert!(validate_object_name("").is_err());
        assert!(validate_object_name("..").is_err());
        assert!(validate_object_name("../etc/passwd").is_err());
        assert!(validate_object_name("a\\b").is_err());
    }

    #[test]
    fn test_storage_error_maps_to_app_error() {
        let err: AppError = StorageError::ConfigError("share dir missing".to_string()).into();
        assert!(matches!(err, AppError::Config(_)));

        let err: AppError = StorageError::Incomplete("chunk 1 missing".to_string()).into();
        assert!(matches!(err, AppError::Integrity(_)));

        let err: AppError = StorageError::UploadFailed("access denied".to_string()).into();
        assert!(matches!(err, AppError::Storage(msg) if msg.contains("access denied")));
    }
}
