use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use stashlink_core::constants::SCRATCH_PREFIX;
use tokio::fs;
use utoipa::ToSchema;

use super::temp_space::is_scratch_entry;
use super::{remove_file_if_exists, remove_tree};
use crate::traits::StorageResult;

/// One session directory or artifact seen by a sweep.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SweepEntry {
    pub name: String,
    pub is_dir: bool,
    pub age_secs: u64,
    pub removed: bool,
    /// Why an expired entry could not be removed.
    pub error: Option<String>,
}

/// Diagnostics of one sweep run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SweepReport {
    #[schema(value_type = String)]
    pub root: PathBuf,
    pub max_age_secs: u64,
    pub entries: Vec<SweepEntry>,
    pub removed: usize,
}

impl SweepReport {
    fn empty(root: &Path, max_age: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            max_age_secs: max_age.as_secs(),
            entries: Vec::new(),
            removed: 0,
        }
    }
}

/// Non-recursive walk of `root`: every session directory or session artifact
/// whose mtime is more than `max_age` before `now` is deleted. Other entries
/// are ignored even when they carry the scratch prefix, since the root may
/// double as the share directory. Entries that vanish mid-walk are skipped; a
/// missing root yields an empty report.
pub(crate) async fn sweep_root(root: &Path, max_age: Duration, now: SystemTime) -> StorageResult<SweepReport> {
    let mut report = SweepReport::empty(root, max_age);

    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !name.starts_with(SCRATCH_PREFIX) {
            continue;
        }

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        // A modification time in the future counts as brand new.
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        let is_dir = metadata.is_dir();
        if !is_scratch_entry(&name, is_dir) {
            continue;
        }

        let mut swept = SweepEntry {
            name,
            is_dir,
            age_secs: age.as_secs(),
            removed: false,
            error: None,
        };

        if age > max_age {
            let result = if is_dir {
                remove_tree(&path).await
            } else {
                remove_file_if_exists(&path).await
            };
            match result {
                Ok(()) => {
                    swept.removed = true;
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to remove expired scratch entry"
                    );
                    swept.error = Some(e.to_string());
                }
            }
        }

        report.entries.push(swept);
    }

    report.entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(report)
}
