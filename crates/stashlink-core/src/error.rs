//! Error types module
//!
//! Every failure in the upload pipeline is expressed as an `AppError`. The
//! variants follow the pipeline's failure classes (auth, token, integrity,
//! configuration, storage) so callers can tell a retryable failure from one
//! that needs operator attention.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_FAILURE")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same request
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid verified session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// One-time token missing, expired, or issued for another purpose.
    #[error("Token mismatch: {0}")]
    TokenMismatch(String),

    /// Chunk data missing or malformed, or the session's chunks are incomplete.
    #[error("Integrity failure: {0}")]
    Integrity(String),

    /// Storage backend not configured or not usable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Write or upload failed after validation passed.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The file was published but the short link could not be registered.
    #[error("Short link registration failed for {url}: {message}")]
    ShortLink { url: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Unauthorized(_) => (
            401,
            "AUTH_FAILURE",
            false,
            Some("Sign in again and reload the upload page"),
            false,
            LogLevel::Debug,
        ),
        AppError::TokenMismatch(_) => (
            403,
            "TOKEN_FAILURE",
            false,
            Some("Request a fresh upload token and start again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Integrity(_) => (
            422,
            "INTEGRITY_FAILURE",
            true,
            Some("Resend the affected chunk"),
            false,
            LogLevel::Warn,
        ),
        AppError::Config(_) => (
            503,
            "CONFIG_FAILURE",
            false,
            Some("Check the storage settings"),
            false,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            502,
            "STORAGE_FAILURE",
            true,
            Some("Retry the finish call"),
            false,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the file name exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::ShortLink { .. } => (
            502,
            "SHORTLINK_FAILURE",
            false,
            Some("Create the short link manually for the published URL"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::TokenMismatch(ref msg) => msg.clone(),
            AppError::Integrity(ref msg) => msg.clone(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Storage(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::ShortLink { url, message } => format!(
                "File uploaded to {} but the short link could not be created: {}",
                url, message
            ),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
