use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::storage_types::StorageBackend;

/// A file placed on a backend and reachable at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PublishedObject {
    pub name: String,
    pub backend: StorageBackend,
    pub url: String,
}

/// One row of the file manager listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileEntry {
    pub name: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub url: String,
}

/// One page of the file manager listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FilePage {
    pub backend: StorageBackend,
    pub items: Vec<FileEntry>,
    /// Pass back as `page_token` to fetch the next page
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListRequest {
    pub page_token: Option<String>,
    pub limit: Option<usize>,
}

impl ListRequest {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_limit_defaults_and_clamps() {
        assert_eq!(ListRequest::default().effective_limit(), 20);
        let req = ListRequest {
            page_token: None,
            limit: Some(0),
        };
        assert_eq!(req.effective_limit(), 1);
        let req = ListRequest {
            page_token: None,
            limit: Some(50_000),
        };
        assert_eq!(req.effective_limit(), 1000);
    }
}
