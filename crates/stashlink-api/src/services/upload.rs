use stashlink_core::{
    AppError, ChunkReceipt, FinishUploadRequest, FinishUploadResponse, NameResolver,
    TransformPolicy, UploadId,
};
use stashlink_storage::{Assembler, ChunkReceiver, Storage, TempSpace};
use std::sync::Arc;
use std::time::Instant;

use super::shortlink::ShortLinkBinder;

/// Drives one upload from chunk to short link.
///
/// Callers must have checked the session and the upload token before
/// calling in; this service only enforces data and configuration rules.
#[derive(Clone)]
pub struct UploadService {
    receiver: ChunkReceiver,
    assembler: Assembler,
    resolver: Arc<NameResolver>,
    storage: Arc<dyn Storage>,
    binder: ShortLinkBinder,
}

impl UploadService {
    pub fn new(
        temp_space: TempSpace,
        resolver: NameResolver,
        storage: Arc<dyn Storage>,
        binder: ShortLinkBinder,
    ) -> Self {
        Self {
            receiver: ChunkReceiver::new(temp_space.clone()),
            assembler: Assembler::new(temp_space),
            resolver: Arc::new(resolver),
            storage,
            binder,
        }
    }

    pub async fn receive_chunk(
        &self,
        raw_upload_id: &str,
        chunk_index: u32,
        data: &[u8],
    ) -> Result<ChunkReceipt, AppError> {
        let upload_id = UploadId::parse(raw_upload_id)?;
        let bytes = self.receiver.receive(&upload_id, chunk_index, data).await?;

        Ok(ChunkReceipt {
            upload_id: upload_id.to_string(),
            chunk_index,
            bytes,
        })
    }

    /// Assemble, name, publish and shorten.
    ///
    /// Backend configuration is checked before the session is touched. A
    /// publish failure keeps the assembled artifact in scratch so the same
    /// call can be repeated.
    #[tracing::instrument(skip(self, request), fields(upload_id = %request.upload_id))]
    pub async fn finish(&self, request: &FinishUploadRequest) -> Result<FinishUploadResponse, AppError> {
        let start = Instant::now();
        let upload_id = UploadId::parse(&request.upload_id)?;
        let policy: TransformPolicy = request
            .convert_filename
            .as_deref()
            .unwrap_or_default()
            .parse()?;

        self.storage.check_ready().await?;

        let artifact = self
            .assembler
            .finish(&upload_id, request.total_chunks)
            .await?;

        let name = self.resolver.resolve(&request.file_name, policy);
        let published = self.storage.publish(&artifact.path, &name).await?;

        tracing::info!(
            key = %published.name,
            backend = %published.backend,
            size_bytes = artifact.size_bytes,
            reused_artifact = artifact.reused,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload published"
        );

        let title = match request.custom_title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => ShortLinkBinder::default_title(policy, &request.file_name),
        };

        let short_url = self
            .binder
            .bind(&published.url, request.custom_shortname.as_deref(), &title)
            .await
            .map_err(|e| AppError::ShortLink {
                url: published.url.clone(),
                message: e.to_string(),
            })?;

        Ok(FinishUploadResponse {
            file_name: published.name,
            url: published.url,
            short_url,
            backend: published.backend,
            size_bytes: artifact.size_bytes,
        })
    }
}
