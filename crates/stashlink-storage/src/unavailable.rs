use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use stashlink_core::{FilePage, ListRequest, PublishedObject, ResolvedName};
use std::path::Path;

/// Stand-in for a selected backend whose settings are incomplete.
///
/// The server still starts; every operation reports the configuration
/// problem, so a finish call fails before it touches the scratch area.
#[derive(Debug, Clone)]
pub struct UnavailableStorage {
    backend: StorageBackend,
    reason: String,
}

impl UnavailableStorage {
    pub fn new(backend: StorageBackend, reason: impl Into<String>) -> Self {
        Self {
            backend,
            reason: reason.into(),
        }
    }

    fn error(&self) -> StorageError {
        StorageError::ConfigError(self.reason.clone())
    }
}

#[async_trait]
impl Storage for UnavailableStorage {
    async fn check_ready(&self) -> StorageResult<()> {
        Err(self.error())
    }

    async fn publish(&self, _artifact: &Path, _name: &ResolvedName) -> StorageResult<PublishedObject> {
        Err(self.error())
    }

    async fn list(&self, _request: &ListRequest) -> StorageResult<FilePage> {
        Err(self.error())
    }

    async fn delete(&self, _name: &str) -> StorageResult<()> {
        Err(self.error())
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}
