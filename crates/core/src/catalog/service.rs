//! Cached catalog reads.
//!
//! Every read runs through [`CacheService::cached`] with a key derived from
//! its validated inputs and the tags listed on the method, then lands in an
//! [`Envelope`]. Database and query failures become failure envelopes; a
//! listing whose search parameters fail validation degrades to an empty page.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::model::{Category, CategoryGroup, ProductHit, ProductView, Subcategory};
use super::pipelines;
use crate::Error;
use crate::cache::{CacheKey, CacheOptions, CacheService};
use crate::config::AppConfig;
use crate::db::{Database, SqliteDocumentStore};
use crate::envelope::{Envelope, Page};
use crate::query::{CategoryFilters, Filter, PageLimits, ProductQuery, SearchParams, SortDirection};
use crate::store::{DocumentStore, FindOptions, collections, find_one};

/// Tag carried by every product read.
pub const PRODUCTS_TAG: &str = "products";
pub const CATEGORIES_TAG: &str = "categories";
pub const SUBCATEGORIES_TAG: &str = "subcategories";

/// Tags for a product read that embeds category and subcategory fields.
fn joined_product_tags(extra: impl IntoIterator<Item = String>) -> Vec<String> {
    [PRODUCTS_TAG, CATEGORIES_TAG, SUBCATEGORIES_TAG].map(String::from).into_iter().chain(extra).collect()
}

pub fn product_tag(id: &str) -> String {
    format!("product:{id}")
}

pub fn category_products_tag(slug: &str) -> String {
    format!("products:category:{slug}")
}

/// Read tuning taken from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSettings {
    pub revalidate: Duration,
    pub page_limits: PageLimits,
    pub related_limit: u64,
    pub search_limit: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CatalogSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            revalidate: config.revalidate(),
            page_limits: config.page_limits(),
            related_limit: config.related_limit,
            search_limit: config.search_limit,
        }
    }
}

/// Storefront catalog reader.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    cache: CacheService,
    settings: CatalogSettings,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>, cache: CacheService, settings: CatalogSettings) -> Self {
        Self { store, cache, settings }
    }

    /// Catalog over the configured SQLite database. The connection opens on
    /// first use.
    pub fn open(config: &AppConfig) -> Self {
        let db = Database::new(&config.db_path);
        let store = SqliteDocumentStore::new(db.clone());
        Self::new(Arc::new(store), CacheService::new(db), CatalogSettings::from(config))
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    fn options(&self, tags: impl IntoIterator<Item = String>) -> CacheOptions {
        tags.into_iter().fold(CacheOptions::new(self.settings.revalidate), CacheOptions::tag)
    }

    /// Paginated, filtered, sorted product listing.
    ///
    /// Malformed search parameters yield a successful empty page; the message
    /// names what was rejected.
    pub async fn get_products(&self, params: &SearchParams) -> Envelope<Page<ProductView>> {
        let query = match params.validate(&self.settings.page_limits) {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(?params, "rejected search parameters: {}", e);
                return Envelope::success(format!("no products: {e}"), Page::empty());
            }
        };
        Envelope::from_result("get_products", self.list_products(&query).await, "products fetched")
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<ProductView>, Error> {
        let key = CacheKey::new(["products", "list"]).with(serde_json::to_string(query)?);
        let options = self.options(joined_product_tags([]));
        self.cache
            .cached(&key, &options, || async {
                let listed = self.store.aggregate(collections::PRODUCTS, &pipelines::listed_products(query)).await?;
                let total = listed.len() as u64;
                let docs = self.store.aggregate(collections::PRODUCTS, &pipelines::product_list(query)).await?;
                Ok(Page { data: decode_all(docs)?, page_count: query.page_count(total) })
            })
            .await
    }

    /// One product with its category names.
    pub async fn get_product(&self, id: &str) -> Envelope<ProductView> {
        let key = CacheKey::new(["product", id]);
        let options = self.options(joined_product_tags([product_tag(id)]));
        let result = self
            .cache
            .cached(&key, &options, || async {
                let docs = self.store.aggregate(collections::PRODUCTS, &pipelines::single_product(id)).await?;
                match docs.into_iter().next() {
                    Some(doc) => decode(doc),
                    None => Err(Error::NotFound(format!("product not found: {id}"))),
                }
            })
            .await;
        Envelope::from_result("get_product", result, "product fetched")
    }

    /// Products of the category with `slug`.
    pub async fn get_products_by_category(&self, slug: &str, filters: &CategoryFilters) -> Envelope<Vec<ProductView>> {
        let result: Result<Vec<ProductView>, Error> = async {
            let query = filters.validate()?;
            let key = CacheKey::new(["products", "category", slug]).with(serde_json::to_string(&query)?);
            let options = self.options(joined_product_tags([category_products_tag(slug)]));
            self.cache
                .cached(&key, &options, || async {
                    let pipeline = pipelines::products_in_category(slug, &query);
                    decode_all(self.store.aggregate(collections::PRODUCTS, &pipeline).await?)
                })
                .await
        }
        .await;
        Envelope::from_result("get_products_by_category", result, "products fetched")
    }

    /// Newest products of the same category, excluding the product itself.
    pub async fn get_related_products(&self, product_id: &str) -> Envelope<Vec<ProductView>> {
        let key = CacheKey::new(["products", "related", product_id]);
        let options = self.options(joined_product_tags([product_tag(product_id)]));
        let result = self
            .cache
            .cached(&key, &options, || async {
                let filter = Filter::new().eq("_id", product_id);
                let product = find_one(self.store.as_ref(), collections::PRODUCTS, &filter)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("product not found: {product_id}")))?;
                let Some(category_id) = product.get("categoryId").and_then(Value::as_str) else {
                    return Ok(Vec::new());
                };
                let pipeline = pipelines::related(product_id, category_id, self.settings.related_limit);
                decode_all(self.store.aggregate(collections::PRODUCTS, &pipeline).await?)
            })
            .await;
        Envelope::from_result("get_related_products", result, "related products fetched")
    }

    /// Name search grouped by category name, in order of first appearance.
    pub async fn get_filtered_products(&self, query: &str) -> Envelope<Vec<CategoryGroup>> {
        let query = query.trim();
        if query.is_empty() {
            return Envelope::success("empty query", Vec::new());
        }

        let key = CacheKey::new(["products", "search", query]);
        let options = self.options([PRODUCTS_TAG.to_string(), CATEGORIES_TAG.to_string()]);
        let result = self
            .cache
            .cached(&key, &options, || async {
                let pipeline = pipelines::name_search(query, self.settings.search_limit)?;
                let hits: Vec<ProductHit> = decode_all(self.store.aggregate(collections::PRODUCTS, &pipeline).await?)?;
                Ok(group_by_category(hits))
            })
            .await;
        Envelope::from_result("get_filtered_products", result, "products found")
    }

    /// Every category, by name.
    pub async fn get_categories(&self) -> Envelope<Vec<Category>> {
        let key = CacheKey::new(["categories"]);
        let options = self.options([CATEGORIES_TAG.to_string()]);
        let result = self
            .cache
            .cached(&key, &options, || async {
                let sorted = FindOptions { sort: vec![("name".to_string(), SortDirection::Asc)], ..Default::default() };
                decode_all(self.store.find(collections::CATEGORIES, &Filter::new(), &sorted).await?)
            })
            .await;
        Envelope::from_result("get_categories", result, "categories fetched")
    }

    /// Subcategories of the category with `category_slug`, by name.
    pub async fn get_subcategories(&self, category_slug: &str) -> Envelope<Vec<Subcategory>> {
        let key = CacheKey::new(["subcategories", category_slug]);
        let options = self.options([SUBCATEGORIES_TAG.to_string(), CATEGORIES_TAG.to_string()]);
        let result = self
            .cache
            .cached(&key, &options, || async {
                let by_slug = Filter::new().eq("slug", category_slug);
                let Some(category) = find_one(self.store.as_ref(), collections::CATEGORIES, &by_slug).await? else {
                    return Ok(Vec::new());
                };
                let category_id = category.get("_id").cloned().unwrap_or(Value::Null);
                let sorted = FindOptions { sort: vec![("name".to_string(), SortDirection::Asc)], ..Default::default() };
                let filter = Filter::new().eq("categoryId", category_id);
                decode_all(self.store.find(collections::SUBCATEGORIES, &filter, &sorted).await?)
            })
            .await;
        Envelope::from_result("get_subcategories", result, "subcategories fetched")
    }

    /// Drop cached reads carrying `tag`.
    pub async fn invalidate_tag(&self, tag: &str) -> Result<u64, Error> {
        self.cache.invalidate_tag(tag).await
    }

    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.cache.purge_expired().await
    }
}

fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, Error> {
    serde_json::from_value(doc).map_err(Error::from)
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, Error> {
    docs.into_iter().map(decode).collect()
}

fn group_by_category(hits: Vec<ProductHit>) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for hit in hits {
        let category = hit.category_name.clone().unwrap_or_else(|| "Uncategorized".to_string());
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.products.push(hit),
            None => groups.push(CategoryGroup { category, products: vec![hit] }),
        }
    }
    groups
}
