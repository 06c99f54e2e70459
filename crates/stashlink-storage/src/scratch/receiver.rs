use stashlink_core::UploadId;

use super::TempSpace;
use crate::traits::{StorageError, StorageResult};

/// Persists one inbound chunk into its session slot.
///
/// Session and token checks happen before this is called; nothing here
/// decides whether the caller may write.
#[derive(Debug, Clone)]
pub struct ChunkReceiver {
    temp_space: TempSpace,
}

impl ChunkReceiver {
    pub fn new(temp_space: TempSpace) -> Self {
        Self { temp_space }
    }

    #[tracing::instrument(skip(self, upload_id, data), fields(upload_id = %upload_id, bytes = data.len()))]
    pub async fn receive(&self, upload_id: &UploadId, chunk_index: u32, data: &[u8]) -> StorageResult<u64> {
        if data.is_empty() {
            return Err(StorageError::Incomplete(format!(
                "No data received for chunk {}",
                chunk_index
            )));
        }

        let written = self.temp_space.write_chunk(upload_id, chunk_index, data).await?;
        tracing::debug!(chunk_index, bytes = written, "Chunk stored");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_empty_chunk_rejected_without_side_effects() {
        let dir = tempdir().unwrap();
        let space = TempSpace::new(dir.path());
        let receiver = ChunkReceiver::new(space.clone());
        let upload = UploadId::parse("empty").unwrap();

        let result = receiver.receive(&upload, 0, &[]).await;
        assert!(matches!(result, Err(StorageError::Incomplete(_))));
        assert!(!space.session_dir(&upload).exists());
    }

    #[tokio::test]
    async fn test_receive_creates_session_on_first_chunk() {
        let dir = tempdir().unwrap();
        let space = TempSpace::new(dir.path());
        let receiver = ChunkReceiver::new(space.clone());
        let upload = UploadId::parse("first").unwrap();

        assert_eq!(receiver.receive(&upload, 0, b"hello").await.unwrap(), 5);
        assert_eq!(receiver.receive(&upload, 1, b"!").await.unwrap(), 1);
        assert_eq!(space.list_chunks(&upload).await.unwrap().len(), 2);
    }
}
