//! Storage setup and initialization

use stashlink_core::Config;
use stashlink_storage::{create_storage, Storage, UnavailableStorage};
use std::sync::Arc;

/// Build the configured publish backend.
///
/// Incomplete backend settings do not stop the server: the backend is
/// replaced by one that reports the problem on every call, so finish fails
/// with a configuration error before touching any upload.
pub fn setup_storage(config: &Config) -> Arc<dyn Storage> {
    tracing::info!(backend = %config.storage_backend, "Initializing storage backend...");

    match create_storage(config) {
        Ok(storage) => {
            tracing::info!(
                backend = %storage.backend_type(),
                "Storage backend initialized successfully"
            );
            storage
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                backend = %config.storage_backend,
                "Storage backend not usable; uploads will fail until it is configured"
            );
            Arc::new(UnavailableStorage::new(config.storage_backend, e.to_string()))
        }
    }
}
