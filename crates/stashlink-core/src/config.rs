//! Configuration module
//!
//! All settings are read once from the environment (and `.env`) at startup and
//! passed into the components that need them. Nothing reads process state later.

use std::env;
use std::path::PathBuf;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 4000;
const SUFFIX_LENGTH: usize = 4;
const MIN_SUFFIX_LENGTH: usize = 1;
const MAX_SUFFIX_LENGTH: usize = 32;
const SESSION_TTL_SECS: u64 = 86_400;
const SWEEP_INTERVAL_SECS: u64 = 3_600;
const MAX_CHUNK_SIZE_MB: usize = 10;
const TOKEN_TTL_SECS: u64 = 43_200;
const MIN_ADMIN_KEY_LENGTH: usize = 32;

/// Object store credentials and publish options.
///
/// Every field is optional at load time; a missing value only becomes an error
/// when the S3 backend is actually used.
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub disable_acl: bool,
}

impl S3Settings {
    /// Names of required settings that are unset or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.access_key) {
            missing.push("S3_ACCESS_KEY");
        }
        if is_blank(&self.secret_key) {
            missing.push("S3_SECRET_KEY");
        }
        if is_blank(&self.region) {
            missing.push("S3_REGION");
        }
        if is_blank(&self.bucket) {
            missing.push("S3_BUCKET");
        }
        missing
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub storage_backend: StorageBackend,
    /// Public base URL of the share directory, always ending with `/`.
    pub share_url: Option<String>,
    /// Local publication directory.
    pub share_dir: Option<PathBuf>,
    /// Root under which per-upload scratch directories are created.
    pub scratch_dir: PathBuf,
    pub suffix_length: usize,
    pub s3: S3Settings,
    pub session_ttl_secs: u64,
    /// 0 disables the periodic sweep.
    pub sweep_interval_secs: u64,
    pub max_chunk_size_bytes: usize,
    pub admin_api_key: String,
    pub token_secret: String,
    pub token_ttl_secs: u64,
    pub shortlink_api_url: String,
    pub shortlink_signature: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = match env::var("STORAGE_TYPE") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => StorageBackend::Local,
        };

        let share_url = optional_var("SHARE_URL").map(|url| normalize_share_url(&url));
        let share_dir = optional_var("SHARE_DIR").map(|dir| normalize_share_dir(&dir));
        let scratch_dir = optional_var("SCRATCH_DIR")
            .map(PathBuf::from)
            .or_else(|| share_dir.clone())
            .unwrap_or_else(env::temp_dir);

        let suffix_length = clamp_suffix_length(
            env::var("SUFFIX_LENGTH")
                .unwrap_or_else(|_| SUFFIX_LENGTH.to_string())
                .trim()
                .parse()
                .unwrap_or(SUFFIX_LENGTH),
        );

        let s3 = S3Settings {
            access_key: optional_var("S3_ACCESS_KEY"),
            secret_key: optional_var("S3_SECRET_KEY"),
            region: optional_var("S3_REGION"),
            bucket: optional_var("S3_BUCKET"),
            endpoint: optional_var("S3_ENDPOINT"),
            disable_acl: env::var("S3_DISABLE_ACL")
                .unwrap_or_else(|_| "false".to_string())
                .trim()
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        let admin_api_key = env::var("ADMIN_API_KEY")
            .map_err(|_| anyhow::anyhow!("ADMIN_API_KEY must be set for authentication"))?;
        let token_secret = optional_var("TOKEN_SECRET").unwrap_or_else(|| admin_api_key.clone());

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            storage_backend,
            share_url,
            share_dir,
            scratch_dir,
            suffix_length,
            s3,
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| SESSION_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SESSION_TTL_SECS),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(SWEEP_INTERVAL_SECS),
            max_chunk_size_bytes: env::var("MAX_CHUNK_SIZE_MB")
                .unwrap_or_else(|_| MAX_CHUNK_SIZE_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_CHUNK_SIZE_MB)
                * 1024
                * 1024,
            admin_api_key,
            token_secret,
            token_ttl_secs: env::var("TOKEN_TTL_SECS")
                .unwrap_or_else(|_| TOKEN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(TOKEN_TTL_SECS),
            shortlink_api_url: env::var("SHORTLINK_API_URL")
                .map_err(|_| anyhow::anyhow!("SHORTLINK_API_URL must be set"))?,
            shortlink_signature: optional_var("SHORTLINK_SIGNATURE"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Rejects malformed values. Missing backend settings are not checked here;
    /// they surface when the backend is first used.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.admin_api_key.len() < MIN_ADMIN_KEY_LENGTH {
            return Err(anyhow::anyhow!(
                "ADMIN_API_KEY must be at least {} characters long",
                MIN_ADMIN_KEY_LENGTH
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !self.shortlink_api_url.starts_with("http://")
            && !self.shortlink_api_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "SHORTLINK_API_URL must be an http(s) URL"
            ));
        }

        if self.max_chunk_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_CHUNK_SIZE_MB must be greater than 0"));
        }

        Ok(())
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// Exactly one trailing slash.
pub fn normalize_share_url(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

pub fn normalize_share_dir(dir: &str) -> PathBuf {
    let trimmed = dir.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        return PathBuf::from("/");
    }
    PathBuf::from(stripped)
}

pub fn clamp_suffix_length(length: usize) -> usize {
    length.clamp(MIN_SUFFIX_LENGTH, MAX_SUFFIX_LENGTH)
}
