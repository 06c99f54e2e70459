//! Scratch area for in-flight uploads.
//!
//! The directory listing is the only session registry: a session exists while
//! its prefixed directory exists, so every operation here is safe to run from
//! any process and after a restart.

mod assembler;
mod receiver;
mod sweep;
mod temp_space;

pub use assembler::{AssembledArtifact, Assembler};
pub use receiver::ChunkReceiver;
pub use sweep::{SweepEntry, SweepReport};
pub use temp_space::TempSpace;

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Removes a file, treating an already missing file as success.
pub(crate) async fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    ignore_not_found(fs::remove_file(path).await)
}

/// Deletes a directory tree. Entries that disappear while the walk is running
/// (a concurrent finish or sweep) are skipped, and a missing root is a no-op.
pub(crate) async fn remove_tree(root: &Path) -> io::Result<()> {
    let mut pending = vec![root.to_path_buf()];
    let mut dirs: Vec<PathBuf> = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if file_type.is_dir() {
                pending.push(path);
            } else {
                remove_file_if_exists(&path).await?;
            }
        }
        dirs.push(dir);
    }

    // Children were pushed after their parents.
    for dir in dirs.iter().rev() {
        ignore_not_found(fs::remove_dir(dir).await)?;
    }
    Ok(())
}
