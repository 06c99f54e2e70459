//! Names and limits shared by the scratch area, the resolver and the API.

/// Prefix of every scratch entry. Published local files never start with it.
pub const SCRATCH_PREFIX: &str = "stashlink_tmp_";

/// Chunk files inside a session directory are named `part_<index>`.
pub const CHUNK_FILE_PREFIX: &str = "part_";

/// Suffix of the assembled artifact, which sits next to the session directory.
pub const ARTIFACT_SUFFIX: &str = ".artifact";

/// Suffix used while an artifact is still being written.
pub const PARTIAL_SUFFIX: &str = ".partial";

pub const MAX_UPLOAD_ID_LENGTH: usize = 128;

/// Length of names produced by the randomized policy.
pub const RANDOMIZED_NAME_LENGTH: usize = 12;

/// Page size of the file manager when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 1000;

/// Base name used when sanitizing leaves nothing.
pub const FALLBACK_BASE_NAME: &str = "file";
