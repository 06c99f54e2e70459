use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use stashlink_core::AppError;
use subtle::ConstantTimeEq;

const API_KEY_HEADER: &str = "x-api-key";

/// Decides whether a request comes from a verified session.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Result<(), AppError>;
}

/// Accepts the admin key as `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeySessionVerifier {
    api_key: String,
}

impl ApiKeySessionVerifier {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

pub(crate) fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn presented_credential(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    bearer.or_else(|| {
        headers
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
    })
}

#[async_trait]
impl SessionVerifier for ApiKeySessionVerifier {
    async fn verify(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let credential = presented_credential(headers).ok_or_else(|| {
            AppError::Unauthorized("Missing session credential".to_string())
        })?;

        if secure_compare(credential, &self.api_key) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Invalid session credential".to_string()))
        }
    }
}
