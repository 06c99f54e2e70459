//! Published file name derivation.
//!
//! A declared file name is only ever a hint: it is reduced to its last path
//! segment, split into base and extension, and transformed by the chosen
//! policy before any backend sees it.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::clamp_suffix_length;
use crate::constants::{FALLBACK_BASE_NAME, RANDOMIZED_NAME_LENGTH};
use crate::error::AppError;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Naming rule applied to the declared file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformPolicy {
    /// Use the declared name unchanged.
    #[default]
    Keep,
    BrowserSafe,
    SafeSuffix,
    Randomized,
}

impl TransformPolicy {
    /// Label used in the default short link title.
    pub fn title_name(&self) -> &'static str {
        match self {
            TransformPolicy::Keep => "original",
            TransformPolicy::BrowserSafe => "browser-safe",
            TransformPolicy::SafeSuffix => "safe-suffix",
            TransformPolicy::Randomized => "randomized",
        }
    }
}

impl FromStr for TransformPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "original" | "keep" | "none" => Ok(TransformPolicy::Keep),
            "browser-safe" | "browser_safe" => Ok(TransformPolicy::BrowserSafe),
            "safe-suffix" | "safe_suffix" => Ok(TransformPolicy::SafeSuffix),
            "randomized" | "random" => Ok(TransformPolicy::Randomized),
            other => Err(AppError::InvalidInput(format!(
                "Unknown convert_filename policy: {}",
                other
            ))),
        }
    }
}

impl Display for TransformPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.title_name())
    }
}

/// A derived name split into base and extension (with its leading dot, or empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub base: String,
    pub extension: String,
}

impl ResolvedName {
    pub fn file_name(&self) -> String {
        format!("{}{}", self.base, self.extension)
    }

    /// Collision probe candidate: attempt 1 is the plain name, attempt `n`
    /// is `base.n.ext`.
    pub fn candidate(&self, attempt: u32) -> String {
        if attempt <= 1 {
            self.file_name()
        } else {
            format!("{}.{}{}", self.base, attempt, self.extension)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameResolver {
    suffix_length: usize,
    unsafe_chars: Regex,
    underscore_runs: Regex,
}

impl NameResolver {
    pub fn new(suffix_length: usize) -> Result<Self, AppError> {
        let unsafe_chars = Regex::new(r"[^()_\-.,0-9a-zA-Z\[\]]")
            .map_err(|e| AppError::Internal(format!("Failed to compile name filter: {}", e)))?;
        let underscore_runs = Regex::new(r"_{2,}")
            .map_err(|e| AppError::Internal(format!("Failed to compile name filter: {}", e)))?;

        Ok(Self {
            suffix_length: clamp_suffix_length(suffix_length),
            unsafe_chars,
            underscore_runs,
        })
    }

    pub fn resolve(&self, original: &str, policy: TransformPolicy) -> ResolvedName {
        self.resolve_at(original, policy, SystemTime::now())
    }

    /// Same as [`resolve`](Self::resolve) with an explicit clock for the
    /// randomized policy.
    pub fn resolve_at(&self, original: &str, policy: TransformPolicy, now: SystemTime) -> ResolvedName {
        let (base, extension) = split_name(original);

        let (base, extension) = match policy {
            TransformPolicy::Keep => (base.to_string(), extension.to_string()),
            TransformPolicy::BrowserSafe => (self.browser_safe(base), self.browser_safe_extension(extension)),
            TransformPolicy::SafeSuffix => (
                format!("{}_{}", self.browser_safe(base), self.random_suffix()),
                self.browser_safe_extension(extension),
            ),
            TransformPolicy::Randomized => (randomized_base(original, now), extension.to_string()),
        };

        ResolvedName {
            base: sanitize_base(base),
            extension,
        }
    }

    fn browser_safe(&self, value: &str) -> String {
        let lowered = value.trim().to_lowercase();
        let replaced = self.unsafe_chars.replace_all(&lowered, "_");
        self.underscore_runs.replace_all(&replaced, "_").into_owned()
    }

    fn browser_safe_extension(&self, extension: &str) -> String {
        match extension.strip_prefix('.') {
            Some(ext) => format!(".{}", self.browser_safe(ext)),
            None => String::new(),
        }
    }

    fn random_suffix(&self) -> String {
        let mut rng = rand::rng();
        (0..self.suffix_length)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect()
    }
}

/// Last path segment split at its final dot. A name whose only dot is the
/// leading one has no extension.
fn split_name(original: &str) -> (&str, &str) {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .trim();

    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) if idx == name.len() - 1 => (&name[..idx], ""),
        Some(idx) => (&name[..idx], &name[idx..]),
    }
}

fn randomized_base(original: &str, now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let digest = Sha256::digest(format!("{}{}", original, secs).as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(RANDOMIZED_NAME_LENGTH);
    encoded
}

/// Published names never start with a dot and are never empty.
fn sanitize_base(base: String) -> String {
    let trimmed = base.trim_start_matches('.');
    if trimmed.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}
