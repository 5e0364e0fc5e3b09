//! Cache key schema and hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered key parts, e.g. `["products", "list", "{...}"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<S: Into<String>>(parts: impl IntoIterator<Item = S>) -> Self {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Append one more part.
    pub fn with(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Stable hex digest used as the storage key.
    pub fn hash(&self) -> String {
        compute_cache_key(&self.0)
    }
}

/// SHA-256 over newline-separated key parts.
pub fn compute_cache_key<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(part.as_ref().as_bytes());
    }
    hex::encode(hasher.finalize())
}
