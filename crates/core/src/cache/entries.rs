//! Cache entry storage.
//!
//! Rows in `cache_entries` hold a serialized value with its expiry; rows in
//! `cache_tags` associate entries with invalidation tags. Deleting an entry
//! cascades to its tags.

use chrono::{Duration, SecondsFormat, Utc};
use tokio_rusqlite::{params, rusqlite};

use super::hash::CacheKey;
use crate::Error;
use crate::db::StoreDb;

/// Timestamps use one fixed format so lexical order equals time order.
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl StoreDb {
    /// Get a fresh cached value by key hash.
    ///
    /// Returns None if the key is absent or its revalidation window has passed.
    pub async fn get_fresh_entry(&self, key_hash: &str) -> Result<Option<String>, Error> {
        let key_hash = key_hash.to_string();
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt =
                    conn.prepare("SELECT value_json FROM cache_entries WHERE key_hash = ?1 AND expires_at > ?2")?;

                match stmt.query_row(params![key_hash, now], |row| row.get(0)) {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a cached value and its tags.
    ///
    /// Tags from a previous value under the same key are dropped.
    pub async fn put_entry(
        &self, key: &CacheKey, value_json: &str, ttl_seconds: i64, tags: &[String],
    ) -> Result<(), Error> {
        let key_hash = key.hash();
        let key_json = serde_json::to_string(key)?;
        let value_json = value_json.to_string();
        let tags = tags.to_vec();

        let now = Utc::now();
        let fetched_at = timestamp(now);
        let expires_at = timestamp(now + Duration::seconds(ttl_seconds));

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_entries (key_hash, key_json, value_json, fetched_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        key_json = excluded.key_json,
                        value_json = excluded.value_json,
                        fetched_at = excluded.fetched_at,
                        expires_at = excluded.expires_at",
                    params![key_hash, key_json, value_json, fetched_at, expires_at],
                )?;
                tx.execute("DELETE FROM cache_tags WHERE key_hash = ?1", params![key_hash])?;
                for tag in &tags {
                    tx.execute(
                        "INSERT OR IGNORE INTO cache_tags (tag, key_hash) VALUES (?1, ?2)",
                        params![tag, key_hash],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry carrying `tag`.
    ///
    /// Returns the number of deleted entries.
    pub async fn invalidate_tag(&self, tag: &str) -> Result<u64, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE key_hash IN (
                        SELECT key_hash FROM cache_tags WHERE tag = ?1
                    )",
                    params![tag],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Keys currently associated with `tag`, oldest first.
    pub async fn keys_for_tag(&self, tag: &str) -> Result<Vec<CacheKey>, Error> {
        let tag = tag.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.key_json FROM cache_tags t
                    JOIN cache_entries e ON e.key_hash = t.key_hash
                    WHERE t.tag = ?1
                    ORDER BY e.fetched_at ASC, e.rowid ASC",
                )?;
                let rows = stmt.query_map(params![tag], |row| row.get::<_, String>(0))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)?;

        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(Error::from))
            .collect()
    }

    /// Delete entries whose revalidation window has passed.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self) -> Result<u64, Error> {
        let now = timestamp(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_and_get_entry() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = CacheKey::new(["categories"]);

        db.put_entry(&key, r#"[{"slug":"shoes"}]"#, 3600, &tags(&["categories"]))
            .await
            .unwrap();

        let value = db.get_fresh_entry(&key.hash()).await.unwrap().unwrap();
        assert_eq!(value, r#"[{"slug":"shoes"}]"#);
    }

    #[tokio::test]
    async fn test_get_missing_entry() {
        let db = StoreDb::open_in_memory().await.unwrap();
        assert!(db.get_fresh_entry("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = CacheKey::new(["short"]);
        db.put_entry(&key, "1", 1, &[]).await.unwrap();
        assert!(db.get_fresh_entry(&key.hash()).await.unwrap().is_some());

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
        assert!(db.get_fresh_entry(&key.hash()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_tag_removes_only_tagged() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let list = CacheKey::new(["products", "list"]);
        let one = CacheKey::new(["product", "p1"]);
        let cats = CacheKey::new(["categories"]);
        db.put_entry(&list, "[]", 3600, &tags(&["products"])).await.unwrap();
        db.put_entry(&one, "{}", 3600, &tags(&["products", "product:p1"])).await.unwrap();
        db.put_entry(&cats, "[]", 3600, &tags(&["categories"])).await.unwrap();

        assert_eq!(db.invalidate_tag("products").await.unwrap(), 2);
        assert!(db.get_fresh_entry(&list.hash()).await.unwrap().is_none());
        assert!(db.get_fresh_entry(&one.hash()).await.unwrap().is_none());
        assert!(db.get_fresh_entry(&cats.hash()).await.unwrap().is_some());

        // cascade removed the other tag rows too
        assert!(db.keys_for_tag("product:p1").await.unwrap().is_empty());
        assert_eq!(db.invalidate_tag("products").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_for_tag() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let a = CacheKey::new(["products", "a"]);
        let b = CacheKey::new(["products", "b"]);
        db.put_entry(&a, "1", 3600, &tags(&["products"])).await.unwrap();
        db.put_entry(&b, "2", 3600, &tags(&["products"])).await.unwrap();

        let keys = db.keys_for_tag("products").await.unwrap();
        assert_eq!(keys, vec![a, b]);
    }

    #[tokio::test]
    async fn test_put_replaces_tags() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = CacheKey::new(["k"]);
        db.put_entry(&key, "1", 3600, &tags(&["old"])).await.unwrap();
        db.put_entry(&key, "2", 3600, &tags(&["new"])).await.unwrap();

        assert!(db.keys_for_tag("old").await.unwrap().is_empty());
        assert_eq!(db.keys_for_tag("new").await.unwrap(), vec![key.clone()]);
        assert_eq!(db.get_fresh_entry(&key.hash()).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_purge_expired_entries() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_entry(&CacheKey::new(["expiring"]), "{}", 1, &[]).await.unwrap();
        db.put_entry(&CacheKey::new(["fresh"]), "{}", 3600, &[]).await.unwrap();

        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

        assert_eq!(db.purge_expired_entries().await.unwrap(), 1);
        assert!(db.get_fresh_entry(&CacheKey::new(["fresh"]).hash()).await.unwrap().is_some());
    }
}
