//! Stashlink Core Library
//!
//! Configuration, the error taxonomy, shared models, and file name resolution
//! shared by the storage and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod naming;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, S3Settings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ChunkReceipt, FileEntry, FilePage, FinishUploadRequest, FinishUploadResponse, ListRequest,
    PublishedObject, UploadId,
};
pub use naming::{NameResolver, ResolvedName, TransformPolicy};
pub use storage_types::StorageBackend;
