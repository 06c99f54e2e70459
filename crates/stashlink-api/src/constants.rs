//! API constants

/// Prefix of all versioned routes; the last segment is the API version
pub const API_PREFIX: &str = "/api/v0";

/// Room left on top of the chunk limit for multipart boundaries and the
/// small text fields sent next to the chunk.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Token purposes. A token issued for one purpose is rejected for any other.
pub mod token_purpose {
    pub const UPLOAD_CHUNK: &str = "upload_chunk";
    pub const MANUAL_CLEANUP: &str = "manual_cleanup";
    pub const DELETE_FILE: &str = "delete_file";

    pub const ALL: [&str; 3] = [UPLOAD_CHUNK, MANUAL_CLEANUP, DELETE_FILE];
}

/// Multipart field names of the chunk request
pub mod chunk_field {
    pub const UPLOAD_ID: &str = "upload_id";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const NONCE: &str = "nonce";
    pub const FILE_CHUNK: &str = "file_chunk";
}

/// Timeout for calls to the short-link service
pub const SHORTLINK_TIMEOUT_SECS: u64 = 15;
