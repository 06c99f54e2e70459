//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use stashlink_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stashlink API",
        version = "0.1.0",
        description = "Chunked file uploads published to a share directory or an S3 bucket, each bound to a short link. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Uploads
        handlers::token::issue_token,
        handlers::chunked_upload::upload_chunk,
        handlers::chunked_upload::finish_upload,
        // Maintenance
        handlers::maintenance::run_sweep,
        // Files
        handlers::files::list_files,
        handlers::files::delete_file,
    ),
    components(
        schemas(
            error::ErrorResponse,
            handlers::token::IssuedToken,
            handlers::maintenance::SweepRequest,
            models::FinishUploadRequest,
            models::FinishUploadResponse,
            models::ChunkReceipt,
            models::FilePage,
            models::FileEntry,
            stashlink_core::StorageBackend,
            stashlink_storage::SweepReport,
            stashlink_storage::SweepEntry,
        )
    ),
    tags(
        (name = "uploads", description = "Chunk upload and finish"),
        (name = "maintenance", description = "Scratch area sweep"),
        (name = "files", description = "Published file manager")
    )
)]
pub struct ApiDoc;
