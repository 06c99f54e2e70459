use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use stashlink_core::constants::{
    ARTIFACT_SUFFIX, CHUNK_FILE_PREFIX, MAX_UPLOAD_ID_LENGTH, PARTIAL_SUFFIX, SCRATCH_PREFIX,
};
use stashlink_core::UploadId;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::sweep::{self, SweepReport};
use super::{remove_file_if_exists, remove_tree};
use crate::traits::{StorageError, StorageResult};

static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Per-upload scratch directories under one root.
#[derive(Debug, Clone)]
pub struct TempSpace {
    root: PathBuf,
}

impl TempSpace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, upload_id: &UploadId) -> PathBuf {
        self.root.join(format!("{}{}", SCRATCH_PREFIX, upload_id))
    }

    pub fn artifact_path(&self, upload_id: &UploadId) -> PathBuf {
        self.root
            .join(format!("{}{}{}", SCRATCH_PREFIX, upload_id, ARTIFACT_SUFFIX))
    }

    /// A fresh file inside the session directory for an artifact still being
    /// written. Every call gets its own name, so concurrent finishes of one
    /// upload never write into the same file.
    pub(crate) fn partial_artifact_path(&self, upload_id: &UploadId) -> PathBuf {
        self.session_dir(upload_id).join(format!(
            "{}.{}.{}{}",
            ARTIFACT_SUFFIX,
            process::id(),
            WRITE_COUNTER.fetch_add(1, Ordering::Relaxed),
            PARTIAL_SUFFIX
        ))
    }

    /// Path of the chunk slot, creating the session directory if needed.
    pub async fn open_chunk_slot(&self, upload_id: &UploadId, chunk_index: u32) -> StorageResult<PathBuf> {
        let dir = self.session_dir(upload_id);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create scratch directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(dir.join(format!("{}{}", CHUNK_FILE_PREFIX, chunk_index)))
    }

    /// Stores one chunk. The bytes go to a hidden temp file first and are
    /// renamed onto the slot, so a reader never sees a half-written chunk and
    /// a resend of the same index replaces the earlier one.
    pub async fn write_chunk(&self, upload_id: &UploadId, chunk_index: u32, data: &[u8]) -> StorageResult<u64> {
        let slot = self.open_chunk_slot(upload_id, chunk_index).await?;
        let tmp = slot.with_file_name(format!(
            ".{}{}.{}.{}.tmp",
            CHUNK_FILE_PREFIX,
            chunk_index,
            process::id(),
            WRITE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_synced(&tmp, data).await {
            let _ = remove_file_if_exists(&tmp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to write chunk {} for {}: {}",
                chunk_index, upload_id, e
            )));
        }

        if let Err(e) = fs::rename(&tmp, &slot).await {
            let _ = remove_file_if_exists(&tmp).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to store chunk {} for {}: {}",
                chunk_index, upload_id, e
            )));
        }

        Ok(data.len() as u64)
    }

    /// Received chunks in ascending numeric index order. A session with no
    /// directory has no chunks.
    pub async fn list_chunks(&self, upload_id: &UploadId) -> StorageResult<Vec<(u32, PathBuf)>> {
        let dir = self.session_dir(upload_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(parse_chunk_index) else {
                continue;
            };
            chunks.push((index, entry.path()));
        }

        chunks.sort_by_key(|(index, _)| *index);
        Ok(chunks)
    }

    pub async fn artifact_exists(&self, upload_id: &UploadId) -> bool {
        fs::try_exists(self.artifact_path(upload_id))
            .await
            .unwrap_or(false)
    }

    /// Removes the chunk directory only; the artifact (if any) is kept.
    pub(crate) async fn remove_session_dir(&self, upload_id: &UploadId) -> StorageResult<()> {
        remove_tree(&self.session_dir(upload_id)).await?;
        Ok(())
    }

    /// Removes every trace of the session: chunks, partial and finished artifact.
    pub async fn destroy(&self, upload_id: &UploadId) -> StorageResult<()> {
        self.remove_session_dir(upload_id).await?;
        remove_file_if_exists(&self.artifact_path(upload_id)).await?;
        Ok(())
    }

    pub async fn sweep_expired(&self, max_age: Duration) -> StorageResult<SweepReport> {
        self.sweep_expired_at(max_age, SystemTime::now()).await
    }

    /// Sweep with an explicit clock.
    pub async fn sweep_expired_at(&self, max_age: Duration, now: SystemTime) -> StorageResult<SweepReport> {
        sweep::sweep_root(&self.root, max_age, now).await
    }
}

/// True only for the two shapes this module creates under the root: a
/// session directory `<prefix><id>` and a session artifact
/// `<prefix><id>.artifact`. The root may be the share directory, so anything
/// else carrying the prefix is not ours.
pub(crate) fn is_scratch_entry(name: &str, is_dir: bool) -> bool {
    let Some(rest) = name.strip_prefix(SCRATCH_PREFIX) else {
        return false;
    };
    let id = if is_dir {
        rest
    } else {
        match rest.strip_suffix(ARTIFACT_SUFFIX) {
            Some(id) => id,
            None => return false,
        }
    };
    !id.is_empty()
        && id.len() <= MAX_UPLOAD_ID_LENGTH
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn parse_chunk_index(file_name: &str) -> Option<u32> {
    let digits = file_name.strip_prefix(CHUNK_FILE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

async fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
