//! Document store seam.
//!
//! Catalog reads go through [`DocumentStore`], so the shipped SQLite-backed
//! store can be replaced (or wrapped in tests) without touching query code.

use async_trait::async_trait;
use serde_json::Value;

use crate::Error;
use crate::query::{Filter, Pipeline, SortDirection, Stage, pipeline};

/// Collection names used by the catalog.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const SUBCATEGORIES: &str = "subcategories";
}

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<(String, SortDirection)>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Equivalent pipeline for a filtered find.
    pub fn to_pipeline(&self, filter: &Filter) -> Pipeline {
        Pipeline::from_optional([
            pipeline::match_stage(filter.clone()),
            pipeline::sort_stage(self.sort.clone()),
            pipeline::skip_stage(self.skip),
            pipeline::limit_stage(self.limit),
        ])
    }
}

/// Collections of JSON documents addressed by name.
///
/// Every document carries a string `_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching `filter`, sorted and paged per `options`.
    async fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, Error>;

    /// Number of documents matching `filter`.
    async fn count_documents(&self, collection: &str, filter: &Filter) -> Result<u64, Error>;

    /// Run an aggregation pipeline over the collection.
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>, Error>;

    /// Insert or replace documents by `_id`; returns the number written.
    async fn insert_many(&self, collection: &str, docs: Vec<Value>) -> Result<u64, Error>;
}

/// Shorthand: find at most one document.
pub async fn find_one(store: &dyn DocumentStore, collection: &str, filter: &Filter) -> Result<Option<Value>, Error> {
    let options = FindOptions { limit: Some(1), ..Default::default() };
    Ok(store.find(collection, filter, &options).await?.into_iter().next())
}

/// Whether the pipeline needs foreign collections loaded.
pub fn has_lookups(pipeline: &Pipeline) -> bool {
    pipeline.stages().iter().any(|s| matches!(s, Stage::Lookup { .. }))
}
