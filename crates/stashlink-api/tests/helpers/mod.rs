//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p stashlink-api`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use stashlink_api::auth::ApiKeySessionVerifier;
use stashlink_api::constants;
use stashlink_api::services::{ShortLinkError, ShortLinkService};
use stashlink_api::setup::{build_state, routes};
use stashlink_core::{Config, S3Settings, StorageBackend};
use stashlink_storage::{LocalStorage, Storage, UnavailableStorage};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-admin-key-min-32-characters-long";
pub const SHARE_URL: &str = "https://files.example.com/share/";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn bearer() -> String {
    format!("Bearer {}", TEST_API_KEY)
}

/// One recorded short-link registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub url: String,
    pub alias: Option<String>,
    pub title: String,
}

/// Short-link service double: records every call and answers
/// `https://sho.rt/<alias or sequence number>`.
#[derive(Default)]
pub struct FakeShortLinks {
    pub calls: Mutex<Vec<Registration>>,
    pub fail_with: Option<String>,
}

#[async_trait]
impl ShortLinkService for FakeShortLinks {
    async fn register(
        &self,
        url: &str,
        alias: Option<&str>,
        title: &str,
    ) -> Result<String, ShortLinkError> {
        if let Some(message) = &self.fail_with {
            return Err(ShortLinkError::Rejected(message.clone()));
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(Registration {
            url: url.to_string(),
            alias: alias.map(str::to_string),
            title: title.to_string(),
        });
        Ok(format!(
            "https://sho.rt/{}",
            alias.map(str::to_string).unwrap_or_else(|| calls.len().to_string())
        ))
    }
}

/// Test application: server plus the directories it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub shortlinks: Arc<FakeShortLinks>,
    pub scratch: TempDir,
    pub share: TempDir,
    /// Scratch and share are the same directory, as with `SCRATCH_DIR` unset.
    pub shared_dir: bool,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    pub fn share_path(&self) -> &Path {
        if self.shared_dir {
            self.scratch.path()
        } else {
            self.share.path()
        }
    }

    /// Number of entries in the scratch root.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }

    pub async fn token(&self, purpose: &str) -> String {
        let response = self
            .server
            .get(&api_path(&format!("/uploads/token?purpose={}", purpose)))
            .add_header("Authorization", bearer())
            .await;
        assert_eq!(response.status_code(), 200);
        let body: serde_json::Value = response.json();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn send_chunk(
        &self,
        upload_id: &str,
        chunk_index: u32,
        data: Vec<u8>,
        nonce: &str,
    ) -> TestResponse {
        let form = MultipartForm::new()
            .add_text("upload_id", upload_id)
            .add_text("chunk_index", chunk_index.to_string())
            .add_text("nonce", nonce)
            .add_part(
                "file_chunk",
                Part::bytes(bytes::Bytes::from(data)).file_name("blob"),
            );
        self.server
            .post(&api_path("/uploads/chunk"))
            .add_header("Authorization", bearer())
            .multipart(form)
            .await
    }

    pub async fn finish(&self, body: serde_json::Value) -> TestResponse {
        self.server
            .post(&api_path("/uploads/finish"))
            .add_header("Authorization", bearer())
            .json(&body)
            .await
    }
}

pub fn create_test_config(scratch: &Path, share: &Path) -> Config {
    Config {
        server_port: 4000,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        storage_backend: StorageBackend::Local,
        share_url: Some(SHARE_URL.to_string()),
        share_dir: Some(share.to_path_buf()),
        scratch_dir: scratch.to_path_buf(),
        suffix_length: 4,
        s3: S3Settings::default(),
        session_ttl_secs: 86_400,
        sweep_interval_secs: 0,
        max_chunk_size_bytes: 10 * 1024 * 1024,
        admin_api_key: TEST_API_KEY.to_string(),
        token_secret: "test-token-secret-min-32-characters-long".to_string(),
        token_ttl_secs: 3_600,
        shortlink_api_url: "http://shortlinks.invalid/yourls-api.php".to_string(),
        shortlink_signature: None,
    }
}

fn build_app(
    storage: Option<Arc<dyn Storage>>,
    shortlinks: FakeShortLinks,
    shared_dir: bool,
) -> TestApp {
    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let share = tempfile::tempdir().expect("Failed to create share dir");
    let share_path = if shared_dir { scratch.path() } else { share.path() };
    let config = create_test_config(scratch.path(), share_path);

    let storage = storage
        .unwrap_or_else(|| Arc::new(LocalStorage::new(share_path, SHARE_URL)));
    let shortlinks = Arc::new(shortlinks);

    let state = build_state(
        config.clone(),
        storage,
        shortlinks.clone(),
        Arc::new(ApiKeySessionVerifier::new(TEST_API_KEY)),
    )
    .expect("Failed to build state");

    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        shortlinks,
        scratch,
        share,
        shared_dir,
    }
}

/// Local backend publishing into a temp share directory.
pub fn setup_test_app() -> TestApp {
    build_app(None, FakeShortLinks::default(), false)
}

/// Local backend whose share directory is also the scratch root, the
/// layout used when `SCRATCH_DIR` is not set.
pub fn setup_shared_dir_app() -> TestApp {
    build_app(None, FakeShortLinks::default(), true)
}

/// Local backend whose short-link service rejects every registration.
pub fn setup_test_app_with_failing_shortlinks(message: &str) -> TestApp {
    build_app(
        None,
        FakeShortLinks {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        },
        false,
    )
}

/// S3 selected but without credentials.
pub fn setup_unconfigured_app() -> TestApp {
    build_app(
        Some(Arc::new(UnavailableStorage::new(
            StorageBackend::S3,
            "S3 storage not configured: S3_ACCESS_KEY, S3_SECRET_KEY, S3_REGION, S3_BUCKET",
        ))),
        FakeShortLinks::default(),
        false,
    )
}
