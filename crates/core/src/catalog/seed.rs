//! Loading catalog documents from a JSON seed file.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{Category, Product, Subcategory};
use super::service::{CATEGORIES_TAG, Catalog, PRODUCTS_TAG, SUBCATEGORIES_TAG};
use crate::Error;
use crate::store::collections;

/// Seed file contents. Missing sections are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub subcategories: Vec<Subcategory>,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Documents written per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: u64,
    pub subcategories: u64,
    pub products: u64,
}

impl SeedData {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::from)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidInput(format!("cannot read seed file {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Products whose `categoryId` names no seeded category.
    pub fn orphaned_products(&self) -> Vec<&str> {
        let known: HashSet<&str> = self.categories.iter().map(|c| c.id.as_str()).collect();
        self.products
            .iter()
            .filter(|p| !known.contains(p.category_id.as_str()))
            .map(|p| p.id.as_str())
            .collect()
    }
}

/// Upsert the seed documents, then drop every cached catalog read.
pub async fn seed(catalog: &Catalog, data: &SeedData) -> Result<SeedReport, Error> {
    let orphans = data.orphaned_products();
    if !orphans.is_empty() {
        tracing::warn!(?orphans, "seeded products reference unknown categories");
    }

    let store = catalog.store();
    let report = SeedReport {
        categories: store.insert_many(collections::CATEGORIES, to_documents(&data.categories)?).await?,
        subcategories: store.insert_many(collections::SUBCATEGORIES, to_documents(&data.subcategories)?).await?,
        products: store.insert_many(collections::PRODUCTS, to_documents(&data.products)?).await?,
    };

    for tag in [PRODUCTS_TAG, CATEGORIES_TAG, SUBCATEGORIES_TAG] {
        catalog.invalidate_tag(tag).await?;
    }
    tracing::info!(
        categories = report.categories,
        subcategories = report.subcategories,
        products = report.products,
        "seeded catalog"
    );
    Ok(report)
}

fn to_documents<T: Serialize>(items: &[T]) -> Result<Vec<Value>, Error> {
    items.iter().map(|item| serde_json::to_value(item).map_err(Error::from)).collect()
}
