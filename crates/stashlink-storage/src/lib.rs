//! Stashlink Storage Library
//!
//! Everything that touches bytes on disk or in a bucket: the scratch area that
//! holds chunks of in-flight uploads, the assembler that stitches them into one
//! artifact, and the publish backends (local share directory and S3-compatible
//! object storage) behind the [`Storage`] trait.
//!
//! # Scratch layout
//!
//! All scratch state lives directly under one root directory and is
//! self-describing by name, so the sweep can reclaim it after a restart:
//!
//! - `stashlink_tmp_<id>/part_<index>`: received chunks
//! - `stashlink_tmp_<id>.artifact`: assembled file awaiting publication
//!
//! Published names are bare file names; backends reject anything with a path
//! separator or a `..` segment.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod scratch;
pub mod traits;
pub mod unavailable;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use scratch::{
    AssembledArtifact, Assembler, ChunkReceiver, SweepEntry, SweepReport, TempSpace,
};
pub use stashlink_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
pub use unavailable::UnavailableStorage;
