use crate::scratch::remove_file_if_exists;
use crate::traits::{validate_object_name, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{ClientOptions, ObjectMeta, ObjectStore, ObjectStoreExt, WriteMultipart};
use stashlink_core::{FileEntry, FilePage, ListRequest, PublishedObject, ResolvedName, S3Settings};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Bytes read from the artifact per multipart write.
const READ_BUFFER_SIZE: usize = 8 * 1024 * 1024;
/// Parts uploaded in parallel.
const MAX_CONCURRENT_PARTS: usize = 4;

/// S3-compatible object storage.
///
/// Objects are stored at the bucket root under the published name. There is
/// no collision check: publishing an existing name replaces the object.
#[derive(Clone)]
pub struct S3Storage {
    /// Used for list and delete.
    store: Arc<dyn ObjectStore>,
    /// Used for uploads; carries the `x-amz-acl` header unless ACLs are disabled.
    publish_store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Build the object store clients from the configured credentials.
    ///
    /// Fails with `ConfigError` when a required setting is missing or the
    /// client cannot be constructed.
    pub fn new(settings: &S3Settings) -> StorageResult<Self> {
        let missing = settings.missing_fields();
        if !missing.is_empty() {
            return Err(StorageError::ConfigError(format!(
                "S3 storage is not configured: {} not set",
                missing.join(", ")
            )));
        }

        let bucket = settings.bucket.clone().unwrap_or_default();
        let region = settings.region.clone().unwrap_or_default();

        let mut builder = AmazonS3Builder::new()
            .with_access_key_id(settings.access_key.clone().unwrap_or_default())
            .with_secret_access_key(settings.secret_key.clone().unwrap_or_default())
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let publish_builder = if settings.disable_acl {
            builder.clone()
        } else {
            let mut headers = HeaderMap::new();
            headers.insert(
                HeaderName::from_static("x-amz-acl"),
                HeaderValue::from_static("public-read"),
            );
            builder
                .clone()
                .with_client_options(ClientOptions::new().with_default_headers(headers))
        };

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        let publish_store = publish_builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            publish_store: Arc::new(publish_store),
            bucket,
            region,
            endpoint_url: settings.endpoint.clone(),
        })
    }

    /// Wrap an existing object store; used for S3-compatible stores built elsewhere.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        endpoint_url: Option<String>,
    ) -> Self {
        Self {
            publish_store: store.clone(),
            store,
            bucket: bucket.into(),
            region: region.into(),
            endpoint_url,
        }
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style on the endpoint: {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        let key = urlencoding::encode(key);
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn to_entry(&self, meta: ObjectMeta) -> FileEntry {
        let name = meta.location.to_string();
        FileEntry {
            url: self.generate_url(&name),
            name,
            size_bytes: meta.size,
            last_modified: Some(meta.last_modified),
        }
    }
}

/// Streams the file into a multipart upload, aborting it on any error.
async fn upload_file(
    store: &Arc<dyn ObjectStore>,
    source: &Path,
    location: &ObjectPath,
) -> StorageResult<u64> {
    let mut file = fs::File::open(source).await.map_err(|e| {
        StorageError::UploadFailed(format!(
            "Failed to open artifact {}: {}",
            source.display(),
            e
        ))
    })?;

    let upload = store
        .put_multipart(location)
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    let mut writer = WriteMultipart::new(upload);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = match file.read(&mut buffer).await {
            Ok(read) => read,
            Err(e) => {
                let _ = writer.abort().await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to read artifact: {}",
                    e
                )));
            }
        };
        if read == 0 {
            break;
        }
        if let Err(e) = writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await {
            let _ = writer.abort().await;
            return Err(StorageError::UploadFailed(e.to_string()));
        }
        writer.write(&buffer[..read]);
        total += read as u64;
    }

    writer
        .finish()
        .await
        .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    Ok(total)
}

#[async_trait]
impl Storage for S3Storage {
    async fn check_ready(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn publish(&self, artifact: &Path, name: &ResolvedName) -> StorageResult<PublishedObject> {
        let key = name.file_name();
        validate_object_name(&key)?;
        let location = ObjectPath::from(key.clone());
        let start = std::time::Instant::now();

        let size = upload_file(&self.publish_store, artifact, &location)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                e
            })?;

        if let Err(e) = remove_file_if_exists(artifact).await {
            tracing::warn!(
                error = %e,
                artifact = %artifact.display(),
                "Failed to remove artifact after upload"
            );
        }

        let url = self.generate_url(&key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(PublishedObject {
            name: key,
            backend: StorageBackend::S3,
            url,
        })
    }

    async fn list(&self, request: &ListRequest) -> StorageResult<FilePage> {
        let limit = request.effective_limit();

        let stream = match request.page_token.as_deref() {
            Some(token) if !token.is_empty() => self
                .store
                .list_with_offset(None, &ObjectPath::from(token.to_string())),
            _ => self.store.list(None),
        };

        // One extra item tells whether another page exists.
        let mut metas: Vec<ObjectMeta> = stream
            .take(limit + 1)
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, "S3 list failed");
                StorageError::ListFailed(e.to_string())
            })?;

        let next_page_token = if metas.len() > limit {
            metas.truncate(limit);
            metas.last().map(|meta| meta.location.to_string())
        } else {
            None
        };

        Ok(FilePage {
            backend: StorageBackend::S3,
            items: metas.into_iter().map(|meta| self.to_entry(meta)).collect(),
            next_page_token,
        })
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        validate_object_name(name)?;
        let start = std::time::Instant::now();
        let location = ObjectPath::from(name.to_string());

        self.store.delete(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(name.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(other.to_string())
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
