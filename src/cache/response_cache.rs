//! Test-case response cache.
//!
//! Cache key is a SHA-256 [`Fingerprint`] of `(description, identifier,
//! criteria)`. Re-submitting the same requirement returns the stored result
//! instead of invoking the generator again, so callers see one stable answer
//! per input even though generation itself is not deterministic.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::store::{short, CachePolicy, CacheStats, CacheStore};

/// Separator written after each fingerprint field.
const FIELD_DELIMITER: &[u8] = b"|";

/// Fixed-length (64 hex chars) key derived from a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one test-case generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCases {
    /// Generated test-case text.
    pub content: String,
    /// Number of whitespace-delimited tokens in `content`.
    pub token_count: usize,
}

impl GeneratedCases {
    /// Wrap generator output, counting its whitespace-delimited tokens.
    pub fn from_content(content: impl Into<String>) -> Self {
        let content = content.into();
        let token_count = content.split_whitespace().count();
        Self {
            content,
            token_count,
        }
    }
}

/// Process-wide cache of generated test cases.
pub struct ResponseCache {
    store: CacheStore<GeneratedCases>,
}

impl ResponseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            store: CacheStore::new(policy),
        }
    }

    /// Deterministic key for a generation request.
    ///
    /// Each field is length-prefixed and followed by `|`; the prefix keeps a
    /// `|` inside user text from shifting into a neighbouring field. An
    /// absent `criteria` hashes the same as an empty one.
    pub fn fingerprint(description: &str, identifier: &str, criteria: Option<&str>) -> Fingerprint {
        let mut hasher = Sha256::new();
        for field in [description, identifier, criteria.unwrap_or_default()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
            hasher.update(FIELD_DELIMITER);
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Look up a cached result.
    pub fn get(&self, key: &Fingerprint) -> Option<GeneratedCases> {
        let hit = self.store.get(key.as_str());
        debug!(
            key = %short(key.as_str()),
            hit = hit.is_some(),
            "Response cache lookup"
        );
        hit
    }

    /// Store a result, replacing any existing entry for `key`.
    pub fn put(&self, key: Fingerprint, result: GeneratedCases) {
        debug!(
            key = %short(key.as_str()),
            tokens = result.token_count,
            "Caching generated test cases"
        );
        self.store.insert(key.0, result);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CachePolicy::unbounded())
    }
}
