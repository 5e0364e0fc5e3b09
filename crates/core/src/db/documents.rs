//! SQLite-backed document collections.
//!
//! Each document is stored as a JSON body keyed by `(collection, _id)`.
//! Queries load the collection in insertion order and evaluate filters and
//! pipelines in process.

use async_trait::async_trait;
use serde_json::Value;
use tokio_rusqlite::params;

use super::connection::{Database, StoreDb};
use crate::Error;
use crate::query::{Filter, Pipeline, engine};
use crate::store::{DocumentStore, FindOptions};

impl StoreDb {
    /// All documents of a collection, in insertion order.
    pub async fn load_collection(&self, collection: &str) -> Result<Vec<Value>, Error> {
        let collection = collection.to_string();
        let bodies = self
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT body FROM documents WHERE collection = ?1 ORDER BY rowid")?;
                let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Error::from))
            .collect()
    }

    /// Insert or replace documents by `_id`.
    ///
    /// Replacing keeps the original insertion position.
    pub async fn upsert_documents(&self, collection: &str, docs: Vec<Value>) -> Result<u64, Error> {
        let collection = collection.to_string();
        let rows = docs
            .iter()
            .map(|doc| {
                let id = doc
                    .get("_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::InvalidInput(format!("document in {collection} has no string _id")))?;
                Ok((id.to_string(), serde_json::to_string(doc)?))
            })
            .collect::<Result<Vec<(String, String)>, Error>>()?;
        let inserted_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut written = 0u64;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO documents (collection, id, body, inserted_at) VALUES (?1, ?2, ?3, ?4)
                        ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
                    )?;
                    for (id, body) in &rows {
                        written += stmt.execute(params![collection, id, body, inserted_at])? as u64;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored documents in a collection.
    pub async fn collection_len(&self, collection: &str) -> Result<u64, Error> {
        let collection = collection.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

/// [`DocumentStore`] over the `documents` table.
#[derive(Clone, Debug)]
pub struct SqliteDocumentStore {
    db: Database,
}

impl SqliteDocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, Error> {
        self.aggregate(collection, &options.to_pipeline(filter)).await
    }

    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, Error> {
        let db = self.db.connect().await?;
        if filter.is_empty() {
            return db.collection_len(collection).await;
        }
        let docs = db.load_collection(collection).await?;
        Ok(docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>, Error> {
        let db = self.db.connect().await?;
        let docs = db.load_collection(collection).await?;
        let mut foreign = engine::ForeignCollections::new();
        for name in pipeline.foreign_collections() {
            let loaded = db.load_collection(&name).await?;
            foreign.insert(name, loaded);
        }
        tracing::debug!(collection, stages = pipeline.stages().len(), "aggregate");
        engine::run(docs, pipeline, &foreign)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<u64, Error> {
        let db = self.db.connect().await?;
        db.upsert_documents(collection, docs).await
    }
}
