use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use stashlink_core::UploadId;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{remove_file_if_exists, TempSpace};
use crate::traits::{StorageError, StorageResult};

/// The concatenated chunks of one session, waiting to be published.
#[derive(Debug, Clone)]
pub struct AssembledArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub chunk_count: usize,
    /// True when an artifact left by an earlier failed publish was reused.
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub struct Assembler {
    temp_space: TempSpace,
}

impl Assembler {
    pub fn new(temp_space: TempSpace) -> Self {
        Self { temp_space }
    }

    /// Concatenates the session's chunks by ascending index into the
    /// session artifact, then removes the chunk directory.
    ///
    /// The artifact is written to a per-call partial file inside the session
    /// directory and renamed when complete; chunks are only deleted after
    /// that, so any failure leaves the session as it was. With `expected_chunks` set, exactly indices
    /// `0..expected_chunks` must be present.
    #[tracing::instrument(skip(self, upload_id), fields(upload_id = %upload_id))]
    pub async fn finish(&self, upload_id: &UploadId, expected_chunks: Option<u32>) -> StorageResult<AssembledArtifact> {
        let chunks = self.temp_space.list_chunks(upload_id).await?;
        let artifact_path = self.temp_space.artifact_path(upload_id);

        if chunks.is_empty() {
            return match fs::metadata(&artifact_path).await {
                Ok(meta) if meta.is_file() => {
                    tracing::info!(
                        path = %artifact_path.display(),
                        size_bytes = meta.len(),
                        "Reusing previously assembled artifact"
                    );
                    Ok(AssembledArtifact {
                        path: artifact_path,
                        size_bytes: meta.len(),
                        chunk_count: 0,
                        reused: true,
                    })
                }
                _ => Err(StorageError::Incomplete(format!(
                    "No chunks received for upload {}",
                    upload_id
                ))),
            };
        }

        if let Some(expected) = expected_chunks {
            check_complete(&chunks, expected)?;
        }

        let start = Instant::now();
        let partial_path = self.temp_space.partial_artifact_path(upload_id);

        let size_bytes = match concatenate(&chunks, &partial_path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = remove_file_if_exists(&partial_path).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&partial_path, &artifact_path).await {
            let _ = remove_file_if_exists(&partial_path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to finalize artifact {}: {}",
                artifact_path.display(),
                e
            )));
        }

        // The artifact is complete; stale chunks would only be reclaimed by the sweep.
        if let Err(e) = self.temp_space.remove_session_dir(upload_id).await {
            tracing::warn!(error = %e, "Failed to remove chunk directory after assembly");
        }

        tracing::info!(
            chunk_count = chunks.len(),
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Assembly complete"
        );

        Ok(AssembledArtifact {
            path: artifact_path,
            size_bytes,
            chunk_count: chunks.len(),
            reused: false,
        })
    }
}

fn check_complete(chunks: &[(u32, PathBuf)], expected: u32) -> StorageResult<()> {
    let contiguous = chunks.len() == expected as usize
        && chunks
            .iter()
            .enumerate()
            .all(|(position, (index, _))| *index as usize == position);

    if contiguous {
        Ok(())
    } else {
        let present: Vec<String> = chunks.iter().map(|(i, _)| i.to_string()).collect();
        Err(StorageError::Incomplete(format!(
            "Expected chunks 0..{} but received [{}]",
            expected,
            present.join(", ")
        )))
    }
}

async fn concatenate(chunks: &[(u32, PathBuf)], output: &Path) -> StorageResult<u64> {
    let file = fs::File::create(output).await.map_err(|e| {
        StorageError::UploadFailed(format!(
            "Failed to open artifact {}: {}",
            output.display(),
            e
        ))
    })?;
    let mut writer = BufWriter::new(file);
    let mut total = 0u64;

    for (index, path) in chunks {
        let mut chunk = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::Incomplete(format!(
                    "Chunk {} disappeared during assembly",
                    index
                )));
            }
            Err(e) => return Err(e.into()),
        };
        total += tokio::io::copy(&mut chunk, &mut writer).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to append chunk {}: {}", index, e))
        })?;
    }

    writer.flush().await?;
    writer.get_ref().sync_all().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, TempSpace, Assembler) {
        let dir = tempdir().unwrap();
        let space = TempSpace::new(dir.path());
        let assembler = Assembler::new(space.clone());
        (dir, space, assembler)
    }

    #[tokio::test]
    async fn test_out_of_order_chunks_assemble_in_index_order() {
        let (_dir, space, assembler) = setup();
        let upload = UploadId::parse("order").unwrap();

        space.write_chunk(&upload, 2, b"CC").await.unwrap();
        space.write_chunk(&upload, 0, b"AA").await.unwrap();
        space.write_chunk(&upload, 1, b"BB").await.unwrap();

        let artifact = assembler.finish(&upload, None).await.unwrap();
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"AABBCC");
        assert_eq!(artifact.size_bytes, 6);
        assert_eq!(artifact.chunk_count, 3);
        assert!(!artifact.reused);
        assert!(!space.session_dir(&upload).exists());
    }

    #[tokio::test]
    async fn test_index_ten_follows_nine() {
        let (_dir, space, assembler) = setup();
        let upload = UploadId::parse("eleven").unwrap();

        for index in (0..=10u32).rev() {
            space.write_chunk(&upload, index, &[index as u8]).await.unwrap();
        }

        let artifact = assembler.finish(&upload, Some(11)).await.unwrap();
        let bytes = std::fs::read(&artifact.path).unwrap();
        assert_eq!(bytes, (0..=10u8).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn test_no_chunks_is_incomplete() {
        let (_dir, _space, assembler) = setup();
        let upload = UploadId::parse("nothing").unwrap();
        let result = assembler.finish(&upload, None).await;
        assert!(matches!(result, Err(StorageError::Incomplete(_))));
    }

    #[tokio::test]
    async fn test_missing_index_rejected_without_mutation() {
        let (_dir, space, assembler) = setup();
        let upload = UploadId::parse("gap").unwrap();
        space.write_chunk(&upload, 0, b"a").await.unwrap();
        space.write_chunk(&upload, 2, b"c").await.unwrap();

        let result = assembler.finish(&upload, Some(3)).await;
        assert!(matches!(result, Err(StorageError::Incomplete(_))));
        assert_eq!(space.list_chunks(&upload).await.unwrap().len(), 2);
        assert!(!space.artifact_path(&upload).exists());
    }

    #[tokio::test]
    async fn test_without_expected_count_gaps_are_tolerated() {
        let (_dir, space, assembler) = setup();
        let upload = UploadId::parse("sparse").unwrap();
        space.write_chunk(&upload, 5, b"b").await.unwrap();
        space.write_chunk(&upload, 1, b"a").await.unwrap();

        let artifact = assembler.finish(&upload, None).await.unwrap();
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"ab");
    }

    #[tokio::test]
    async fn test_retry_reuses_retained_artifact() {
        let (_dir, space, assembler) = setup();
        let upload = UploadId::parse("retry").unwrap();
        space.write_chunk(&upload, 0, b"payload").await.unwrap();

        let first = assembler.finish(&upload, None).await.unwrap();
        let second = assembler.finish(&upload, None).await.unwrap();
        assert!(second.reused);
        assert_eq!(second.path, first.path);
        assert_eq!(second.size_bytes, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_finishes_produce_intact_artifact() {
        let (dir, space, assembler) = setup();
        let upload = UploadId::parse("racing").unwrap();

        let mut expected = Vec::new();
        for index in 0..8u32 {
            let chunk = vec![b'a' + index as u8; 64 * 1024];
            expected.extend_from_slice(&chunk);
            space.write_chunk(&upload, index, &chunk).await.unwrap();
        }

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let assembler = assembler.clone();
                let upload = upload.clone();
                tokio::spawn(async move { assembler.finish(&upload, None).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert!(succeeded >= 1);
        assert!(std::fs::read(space.artifact_path(&upload)).unwrap() == expected);

        let leftovers: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty(), "partial files left: {:?}", leftovers);
    }
}
