use crate::scratch::remove_file_if_exists;
use crate::traits::{validate_object_name, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stashlink_core::constants::{FALLBACK_BASE_NAME, SCRATCH_PREFIX};
use stashlink_core::{FileEntry, FilePage, ListRequest, PublishedObject, ResolvedName};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Upper bound on `name.N.ext` probes before giving up.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Publishes into a flat share directory served at `base_url`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Share directory; it must already exist
    /// * `base_url` - URL the share directory is served at (e.g., "https://example.com/share/")
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        LocalStorage {
            base_path: base_path.into(),
            base_url: format!("{}/", base_url.trim_end_matches('/')),
        }
    }

    fn name_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_object_name(name)?;
        Ok(self.base_path.join(name))
    }

    /// The share directory may also be the scratch root, so published names
    /// never start with the scratch prefix.
    fn outside_scratch_namespace(name: &ResolvedName) -> ResolvedName {
        if name.base.starts_with(SCRATCH_PREFIX) {
            ResolvedName {
                base: format!("{}_{}", FALLBACK_BASE_NAME, name.base),
                extension: name.extension.clone(),
            }
        } else {
            name.clone()
        }
    }

    /// Generate public URL for file
    fn generate_url(&self, name: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(name))
    }

    /// Reserves the first free name of `name`, `name.2`, `name.3`, ... by
    /// creating an empty placeholder with `create_new`, so two concurrent
    /// publishes can never pick the same name.
    async fn claim_name(&self, name: &ResolvedName) -> StorageResult<(String, PathBuf)> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let candidate = name.candidate(attempt);
            let path = self.name_to_path(&candidate)?;

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok((candidate, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    return Err(StorageError::ConfigError(format!(
                        "Share directory {} is not writable: {}",
                        self.base_path.display(),
                        e
                    )));
                }
                Err(e) => {
                    return Err(StorageError::UploadFailed(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(StorageError::UploadFailed(format!(
            "No free name for {} after {} attempts",
            name.file_name(),
            MAX_NAME_ATTEMPTS
        )))
    }
}

/// Rename, falling back to copy and remove when the scratch area sits on
/// another filesystem.
async fn move_into_place(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            fs::copy(from, to).await?;
            remove_file_if_exists(from).await
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn check_ready(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Share directory {} is not accessible: {}",
                self.base_path.display(),
                e
            ))
        })?;

        if !meta.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Share directory {} is not a directory",
                self.base_path.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(StorageError::ConfigError(format!(
                "Share directory {} is not writable",
                self.base_path.display()
            )));
        }
        Ok(())
    }

    async fn publish(&self, artifact: &Path, name: &ResolvedName) -> StorageResult<PublishedObject> {
        self.check_ready().await?;
        let start = std::time::Instant::now();

        let name = Self::outside_scratch_namespace(name);
        let (final_name, path) = self.claim_name(&name).await?;

        if let Err(e) = move_into_place(artifact, &path).await {
            let _ = remove_file_if_exists(&path).await;
            tracing::error!(
                error = %e,
                artifact = %artifact.display(),
                path = %path.display(),
                "Local publish failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "Failed to move artifact to {}: {}",
                path.display(),
                e
            )));
        }

        let url = self.generate_url(&final_name);

        tracing::info!(
            path = %path.display(),
            key = %final_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local publish successful"
        );

        Ok(PublishedObject {
            name: final_name,
            backend: StorageBackend::Local,
            url,
        })
    }

    async fn list(&self, request: &ListRequest) -> StorageResult<FilePage> {
        let mut entries = fs::read_dir(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Share directory {} is not readable: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with(SCRATCH_PREFIX) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
            files.push(FileEntry {
                url: self.generate_url(&name),
                name,
                size_bytes: meta.len(),
                last_modified,
            });
        }

        // Newest first, name as tie-breaker so pages are stable.
        files.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.name.cmp(&b.name))
        });

        let offset = match request.page_token.as_deref() {
            Some(token) => token.parse::<usize>().map_err(|_| {
                StorageError::InvalidKey(format!("Invalid page token: {}", token))
            })?,
            None => 0,
        };
        let limit = request.effective_limit();
        let end = offset.saturating_add(limit).min(files.len());
        let next_page_token = (end < files.len()).then(|| end.to_string());
        let items = if offset < files.len() {
            files.drain(offset..end).collect()
        } else {
            Vec::new()
        };

        Ok(FilePage {
            backend: StorageBackend::Local,
            items,
            next_page_token,
        })
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.name_to_path(name)?;
        if name.starts_with(SCRATCH_PREFIX) {
            return Err(StorageError::InvalidKey(format!(
                "'{}' belongs to an upload in progress",
                name
            )));
        }
        let start = std::time::Instant::now();

        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_file() {
            return Err(StorageError::InvalidKey(format!("'{}' is not a file", name)));
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn resolved(base: &str, extension: &str) -> ResolvedName {
        ResolvedName {
            base: base.to_string(),
            extension: extension.to_string(),
        }
    }

    fn artifact(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    #[tokio::test]
    async fn test_publish_moves_artifact_and_builds_url() {
        let share = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let storage = LocalStorage::new(share.path(), "https://files.example.com/share");

        let source = artifact(scratch.path(), "stashlink_tmp_a.artifact", b"hello");
        let published = storage
            .publish(&source, &resolved("hello", ".txt"))
            .await
            .unwrap();

        assert_eq!(published.name, "hello.txt");
        assert_eq!(published.url, "https://files.example.com/share/hello.txt");
        assert_eq!(published.backend, StorageBackend::Local);
        assert!(!source.exists());
        assert_eq!(std::fs::read(share.path().join("hello.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_collisions_probe_numbered_names() {
        let share = tempdir().unwrap();
        let scratch = tempdir().unwrap();
        let storage = LocalStorage::new(share.path(), "https://files.example.com/");
        std::fs::write(share.path().join("report.txt"), b"original").unwrap();

        let second = storage
            .publish(&artifact(scratch.path(), "a", b"two"), &resolved("report", ".txt"))
            .await
            .unwrap();
        let third = storage
            .publish(&artifact(scratch.path(), "b", b"three"), &resolved("report", ".txt"))
            .await
            .unwrap();

        assert_eq!(second.name, "report.2.txt");
        assert_eq!(third.name, "report.3.txt");
        assert_eq!(std::fs::read(share.path().join("report.txt")).unwrap(), b"original");
        assert_eq!(std::fs::read(share.path().join("report.3.txt")).unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_missing_share_dir_is_config_error() {
        let scratch = tempdir().unwrap();
        let storage = LocalStorage::new(scratch.path().join("absent"), "https://x.test/");
        let source = artifact(scratch.path(), "artifact", b"data");

        let result = storage.publish(&source, &resolved("data", ".bin")).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
        assert!(source.exists());
        assert!(matches!(
            storage.check_ready().await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_returns_files_only() {
        let share = tempdir().unwrap();
        let storage = LocalStorage::new(share.path(), "https://x.test/");
        std::fs::write(share.path().join("a.txt"), b"a").unwrap();
        std::fs::write(share.path().join("b.txt"), b"bb").unwrap();
        std::fs::create_dir(share.path().join("nested")).unwrap();

        let page = storage.list(&ListRequest::default()).await.unwrap();
        let mut names: Vec<_> = page.items.iter().map(|f| f.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let share = tempdir().unwrap();
        let storage = LocalStorage::new(share.path(), "https://x.test/");
        for i in 0..5 {
            std::fs::write(share.path().join(format!("f{}.txt", i)), b"x").unwrap();
        }

        let first = storage
            .list(&ListRequest {
                page_token: None,
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let last = storage
            .list(&ListRequest {
                page_token: Some("4".to_string()),
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal_and_missing() {
        let share = tempdir().unwrap();
        let storage = LocalStorage::new(share.path(), "https://x.test/");
        std::fs::write(share.path().join("keep.txt"), b"x").unwrap();

        assert!(matches!(
            storage.delete("../keep.txt").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.delete("missing.txt").await,
            Err(StorageError::NotFound(_))
        ));

        storage.delete("keep.txt").await.unwrap();
        assert!(!share.path().join("keep.txt").exists());
    }

    mod shared_directory {
        use super::*;
        use crate::scratch::{Assembler, TempSpace};
        use stashlink_core::UploadId;
        use std::time::{Duration, SystemTime};

        const DAY: Duration = Duration::from_secs(86_400);

        #[tokio::test]
        async fn test_prefixed_name_survives_sweep() {
            let dir = tempdir().unwrap();
            let space = TempSpace::new(dir.path());
            let storage = LocalStorage::new(dir.path(), "https://x.test/");
            let upload = UploadId::parse("notes").unwrap();
            space.write_chunk(&upload, 0, b"my notes").await.unwrap();

            let artifact = Assembler::new(space.clone())
                .finish(&upload, None)
                .await
                .unwrap();
            let published = storage
                .publish(&artifact.path, &resolved("stashlink_tmp_notes", ".txt"))
                .await
                .unwrap();
            assert_eq!(published.name, "file_stashlink_tmp_notes.txt");

            let report = space
                .sweep_expired_at(DAY, SystemTime::now() + DAY * 2)
                .await
                .unwrap();
            assert_eq!(report.removed, 0);
            assert_eq!(
                std::fs::read(dir.path().join(&published.name)).unwrap(),
                b"my notes"
            );
        }

        #[tokio::test]
        async fn test_list_and_delete_skip_scratch_entries() {
            let dir = tempdir().unwrap();
            let space = TempSpace::new(dir.path());
            let storage = LocalStorage::new(dir.path(), "https://x.test/");
            std::fs::write(dir.path().join("shared.txt"), b"x").unwrap();

            let retained = UploadId::parse("u2").unwrap();
            space.write_chunk(&retained, 0, b"assembled").await.unwrap();
            Assembler::new(space.clone())
                .finish(&retained, None)
                .await
                .unwrap();
            space
                .write_chunk(&UploadId::parse("u3").unwrap(), 0, b"pending")
                .await
                .unwrap();

            let page = storage.list(&ListRequest::default()).await.unwrap();
            let names: Vec<_> = page.items.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["shared.txt"]);

            assert!(matches!(
                storage.delete("stashlink_tmp_u2.artifact").await,
                Err(StorageError::InvalidKey(_))
            ));
            assert!(space.artifact_exists(&retained).await);
        }
    }
}
