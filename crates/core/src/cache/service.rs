//! Read-through cache service.
//!
//! [`CacheService`] is passed by reference to whatever serves reads. A read
//! wrapped in [`CacheService::cached`] runs at most once per key inside its
//! revalidation window; afterwards the stored value is returned until the
//! window passes or one of the entry's tags is invalidated.

use std::future::Future;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use super::hash::CacheKey;
use crate::Error;
use crate::db::Database;

/// Revalidation window and invalidation tags for one cached read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    pub revalidate: Duration,
    pub tags: Vec<String>,
}

impl CacheOptions {
    pub fn new(revalidate: Duration) -> Self {
        Self { revalidate, tags: Vec::new() }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    fn ttl_seconds(&self) -> i64 {
        i64::try_from(self.revalidate.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Keyed, tag-addressable cache over the shared database.
#[derive(Clone, Debug)]
pub struct CacheService {
    db: Database,
}

impl CacheService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the cached value for `key`, or run `fetch` and store its result.
    ///
    /// Errors from `fetch` propagate and are not cached. Failures of the cache
    /// itself are logged and treated as a miss.
    pub async fn cached<T, F, Fut>(&self, key: &CacheKey, options: &CacheOptions, fetch: F) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let key_hash = key.hash();

        match self.lookup(&key_hash).await {
            Ok(Some(json)) => match serde_json::from_str::<T>(&json) {
                Ok(value) => {
                    tracing::debug!(key = ?key.parts(), "cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(key = ?key.parts(), "discarding undecodable cache entry: {}", e),
            },
            Ok(None) => tracing::debug!(key = ?key.parts(), "cache miss"),
            Err(e) => tracing::warn!(key = ?key.parts(), "cache lookup failed: {}", e),
        }

        let value = fetch().await?;

        match serde_json::to_string(&value) {
            Ok(json) => {
                if let Err(e) = self.store(key, &json, options).await {
                    tracing::warn!(key = ?key.parts(), "failed to cache value: {}", e);
                }
            }
            Err(e) => tracing::warn!(key = ?key.parts(), "failed to serialize value for cache: {}", e),
        }

        Ok(value)
    }

    async fn lookup(&self, key_hash: &str) -> Result<Option<String>, Error> {
        self.db.connect().await?.get_fresh_entry(key_hash).await
    }

    async fn store(&self, key: &CacheKey, json: &str, options: &CacheOptions) -> Result<(), Error> {
        self.db
            .connect()
            .await?
            .put_entry(key, json, options.ttl_seconds(), &options.tags)
            .await
    }

    /// Expire every entry carrying `tag`; returns the number removed.
    pub async fn invalidate_tag(&self, tag: &str) -> Result<u64, Error> {
        let removed = self.db.connect().await?.invalidate_tag(tag).await?;
        tracing::info!(tag, removed, "invalidated cache tag");
        Ok(removed)
    }

    /// Keys currently associated with `tag`.
    pub async fn keys_for_tag(&self, tag: &str) -> Result<Vec<CacheKey>, Error> {
        self.db.connect().await?.keys_for_tag(tag).await
    }

    /// Remove entries whose window has passed; returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.db.connect().await?.purge_expired_entries().await
    }
}
