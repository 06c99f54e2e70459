#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use stashlink_core::Config;
use std::sync::Arc;

/// Create the publish backend selected by `STORAGE_TYPE`.
///
/// Missing settings are reported as `ConfigError`; the caller decides whether
/// that is fatal.
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let storage = S3Storage::new(&config.s3)?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let share_dir = config.share_dir.clone().ok_or_else(|| {
                StorageError::ConfigError("SHARE_DIR not configured".to_string())
            })?;
            let share_url = config.share_url.clone().ok_or_else(|| {
                StorageError::ConfigError("SHARE_URL not configured".to_string())
            })?;

            Ok(Arc::new(LocalStorage::new(share_dir, share_url)))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
