//! Purpose-bound upload tokens
//!
//! Token format: `<hmac>.<timestamp>.<nonce>` where the HMAC-SHA256 covers
//! `<purpose>.<timestamp>.<nonce>`. Tokens are stateless; a token stays
//! valid for its purpose until it expires.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use stashlink_core::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Tolerated clock skew for timestamps slightly in the future.
const MAX_FUTURE_SKEW_SECS: u64 = 60;

pub trait TokenService: Send + Sync {
    fn issue(&self, purpose: &str) -> Result<String, AppError>;
    fn verify(&self, purpose: &str, token: &str) -> bool;
}

pub struct HmacTokenService {
    secret: String,
    ttl_secs: u64,
}

impl HmacTokenService {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    fn sign(&self, purpose: &str, timestamp: u64, nonce: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid token secret: {}", e)))?;
        mac.update(format!("{}.{}.{}", purpose, timestamp, nonce).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn issue_at(&self, purpose: &str, now: u64) -> Result<String, AppError> {
        let nonce = Uuid::new_v4().to_string();
        let hmac = self.sign(purpose, now, &nonce)?;
        Ok(format!("{}.{}.{}", hmac, now, nonce))
    }

    pub fn verify_at(&self, purpose: &str, token: &str, now: u64) -> bool {
        let parts: Vec<&str> = token.split('.').collect();
        let [hmac_part, timestamp_str, nonce] = parts.as_slice() else {
            return false;
        };

        let Ok(timestamp) = timestamp_str.parse::<u64>() else {
            return false;
        };

        if timestamp > now.saturating_add(MAX_FUTURE_SKEW_SECS) {
            tracing::debug!(purpose, "Token timestamp in the future");
            return false;
        }
        if timestamp.saturating_add(self.ttl_secs) < now {
            tracing::debug!(purpose, "Token expired");
            return false;
        }

        let Ok(expected) = self.sign(purpose, timestamp, nonce) else {
            return false;
        };
        expected.as_bytes().ct_eq(hmac_part.as_bytes()).into()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TokenService for HmacTokenService {
    fn issue(&self, purpose: &str) -> Result<String, AppError> {
        self.issue_at(purpose, unix_now())
    }

    fn verify(&self, purpose: &str, token: &str) -> bool {
        self.verify_at(purpose, token, unix_now())
    }
}
