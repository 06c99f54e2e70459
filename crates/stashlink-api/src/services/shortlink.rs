//! Short-link registration
//!
//! The short-link service is external. `ShortLinkBinder` only picks the
//! title; alias handling and storage of the link belong to the service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use stashlink_core::TransformPolicy;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ShortLinkError {
    #[error("Short-link service unreachable: {0}")]
    Transport(String),

    #[error("Short-link service rejected the request: {0}")]
    Rejected(String),

    #[error("Invalid short-link service response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ShortLinkService: Send + Sync {
    /// Registers `url` and returns the short URL. An empty or absent alias
    /// lets the service choose the keyword.
    async fn register(
        &self,
        url: &str,
        alias: Option<&str>,
        title: &str,
    ) -> Result<String, ShortLinkError>;
}

/// Client for a YOURLS-compatible `action=shorturl` endpoint.
pub struct YourlsClient {
    client: Client,
    api_url: String,
    signature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShortUrlResponse {
    #[serde(default)]
    shorturl: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl YourlsClient {
    pub fn new(
        api_url: impl Into<String>,
        signature: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ShortLinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShortLinkError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            signature,
        })
    }
}

#[async_trait]
impl ShortLinkService for YourlsClient {
    async fn register(
        &self,
        url: &str,
        alias: Option<&str>,
        title: &str,
    ) -> Result<String, ShortLinkError> {
        let mut form = vec![
            ("action", "shorturl"),
            ("format", "json"),
            ("url", url),
            ("keyword", alias.unwrap_or("")),
            ("title", title),
        ];
        if let Some(signature) = self.signature.as_deref() {
            form.push(("signature", signature));
        }

        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ShortLinkError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ShortLinkError::Transport(e.to_string()))?;

        // The service answers an already-shortened URL with a failure status
        // but still returns the existing short URL.
        let body: ShortUrlResponse = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                ShortLinkError::InvalidResponse(e.to_string())
            } else {
                ShortLinkError::Rejected(format!("HTTP {}: {}", status, text))
            }
        })?;

        match body.shorturl.filter(|s| !s.is_empty()) {
            Some(short_url) => Ok(short_url),
            None => Err(ShortLinkError::Rejected(
                body.message
                    .unwrap_or_else(|| format!("HTTP {} without short URL", status)),
            )),
        }
    }
}

/// Binds a published URL to a short link.
#[derive(Clone)]
pub struct ShortLinkBinder {
    service: Arc<dyn ShortLinkService>,
}

impl ShortLinkBinder {
    pub fn new(service: Arc<dyn ShortLinkService>) -> Self {
        Self { service }
    }

    /// `"<policy>: <basename>"`, where basename is the declared name without
    /// any client-side path.
    pub fn default_title(policy: TransformPolicy, original_name: &str) -> String {
        let basename = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_name);
        format!("{}: {}", policy.title_name(), basename)
    }

    #[tracing::instrument(skip(self, title), fields(url = %url))]
    pub async fn bind(
        &self,
        url: &str,
        alias: Option<&str>,
        title: &str,
    ) -> Result<String, ShortLinkError> {
        let alias = alias.map(str::trim).filter(|a| !a.is_empty());
        let short_url = self.service.register(url, alias, title).await?;
        tracing::info!(short_url = %short_url, "Short link created");
        Ok(short_url)
    }
}
