//! Flat search parameters and their validation.
//!
//! Storefront pages hand over query-string values as strings. This module
//! normalises them into typed queries:
//!
//! - pagination falls back to defaults instead of failing,
//! - sort specs are `"field.direction"`,
//! - id lists are dot-joined (`"c1.c2"`),
//! - price ranges are dash-joined with optional ends (`"10-"`, `"-50"`, `"10-50"`).
//!
//! Anything malformed beyond that is reported as a [`ValidationError`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filter::Filter;
use super::pipeline::SortDirection;

/// Fields a listing may be sorted by.
pub const SORTABLE_FIELDS: &[&str] = &["createdAt", "updatedAt", "price", "name", "inventory"];

/// Search parameters rejected by the validation step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid sort {0:?}: expected <field>.<asc|desc>")]
    Sort(String),

    #[error("unsupported sort field {0:?}")]
    SortField(String),

    #[error("invalid price range {0:?}: expected <min>-<max>")]
    PriceRange(String),

    #[error("invalid price bound {field}: {value:?}")]
    PriceBound { field: &'static str, value: String },
}

/// Raw search parameters as received from a storefront page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// 1-based page number (default 1).
    #[serde(default)]
    pub page: Option<String>,

    /// Page size (default 10).
    #[serde(default)]
    pub per_page: Option<String>,

    /// Sort spec `<field>.<asc|desc>`, e.g. `price.asc` (default `createdAt.desc`).
    #[serde(default)]
    pub sort: Option<String>,

    /// Dot-joined category ids.
    #[serde(default)]
    pub categories: Option<String>,

    /// Dot-joined subcategory ids.
    #[serde(default)]
    pub subcategories: Option<String>,

    /// Dash-joined price range, either end optional.
    #[serde(default)]
    pub price_range: Option<String>,
}

impl SearchParams {
    /// Build from key/value pairs; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                "sort" => &mut params.sort,
                "categories" => &mut params.categories,
                "subcategories" => &mut params.subcategories,
                "price_range" => &mut params.price_range,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }

    /// Validate and normalise into a [`ProductQuery`].
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a malformed sort spec or price range.
    pub fn validate(&self, limits: &PageLimits) -> Result<ProductQuery, ValidationError> {
        let page = parse_positive(self.page.as_deref()).unwrap_or(1);
        let per_page = parse_positive(self.per_page.as_deref())
            .unwrap_or(limits.default_per_page)
            .min(limits.max_per_page);

        Ok(ProductQuery {
            page,
            per_page,
            sort: SortSpec::parse(self.sort.as_deref())?,
            category_ids: split_ids(self.categories.as_deref()),
            subcategory_ids: split_ids(self.subcategories.as_deref()),
            price: PriceRange::parse(self.price_range.as_deref())?,
        })
    }
}

/// Pagination bounds applied during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default_per_page: 10, max_per_page: 100 }
    }
}

/// Sort tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self { field: "createdAt".to_string(), direction: SortDirection::Desc }
    }
}

impl SortSpec {
    /// Parse `"field.direction"`; absent or blank yields the default.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };
        let (field, direction) = raw.rsplit_once('.').ok_or_else(|| ValidationError::Sort(raw.to_string()))?;
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(ValidationError::Sort(raw.to_string())),
        };
        if !SORTABLE_FIELDS.contains(&field) {
            return Err(ValidationError::SortField(field.to_string()));
        }
        Ok(Self { field: field.to_string(), direction })
    }

    /// Keys for a `$sort` stage.
    pub fn keys(&self) -> Vec<(String, SortDirection)> {
        vec![(self.field.clone(), self.direction)]
    }
}

/// Inclusive price bounds; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    /// Parse `"min-max"`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };
        let (min, max) = raw.split_once('-').ok_or_else(|| ValidationError::PriceRange(raw.to_string()))?;
        let range = Self { min: parse_bound("min", min)?, max: parse_bound("max", max)? };
        if let (Some(min), Some(max)) = (range.min, range.max)
            && min > max
        {
            return Err(ValidationError::PriceRange(raw.to_string()));
        }
        Ok(range)
    }

    /// Build from separate `gte`/`lte` strings.
    pub fn from_bounds(gte: Option<&str>, lte: Option<&str>) -> Result<Self, ValidationError> {
        Ok(Self {
            min: gte.map(|v| parse_bound("gte", v)).transpose()?.flatten(),
            max: lte.map(|v| parse_bound("lte", v)).transpose()?.flatten(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Add `$gte`/`$lte` conditions for the present ends.
    pub fn apply(&self, filter: Filter, field: &str) -> Filter {
        let filter = match self.min {
            Some(min) => filter.gte(field, min),
            None => filter,
        };
        match self.max {
            Some(max) => filter.lte(field, max),
            None => filter,
        }
    }
}

/// Validated listing query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub page: u64,
    pub per_page: u64,
    pub sort: SortSpec,
    pub category_ids: Vec<String>,
    pub subcategory_ids: Vec<String>,
    pub price: PriceRange,
}

impl ProductQuery {
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Filter document over the products collection.
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if !self.category_ids.is_empty() {
            filter = filter.in_values("categoryId", self.category_ids.clone());
        }
        if !self.subcategory_ids.is_empty() {
            filter = filter.in_values("subcategoryId", self.subcategory_ids.clone());
        }
        self.price.apply(filter, "price")
    }

    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.per_page)
    }
}

/// Filters for reads scoped to one category slug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryFilters {
    /// Target audience, e.g. `men`.
    #[serde(default)]
    pub sex: Option<String>,

    /// Minimum price (inclusive).
    #[serde(default)]
    pub gte: Option<String>,

    /// Maximum price (inclusive).
    #[serde(default)]
    pub lte: Option<String>,

    /// Subcategory slug.
    #[serde(default)]
    pub subcategory: Option<String>,

    /// Sort spec `<field>.<asc|desc>`.
    #[serde(default)]
    pub sort: Option<String>,
}

/// Validated [`CategoryFilters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryQuery {
    pub sex: Option<String>,
    pub price: PriceRange,
    pub subcategory: Option<String>,
    pub sort: SortSpec,
}

impl CategoryFilters {
    /// # Errors
    ///
    /// Returns a `ValidationError` for non-numeric bounds or a malformed sort.
    pub fn validate(&self) -> Result<CategoryQuery, ValidationError> {
        Ok(CategoryQuery {
            sex: non_blank(self.sex.as_deref()),
            price: PriceRange::from_bounds(self.gte.as_deref(), self.lte.as_deref())?,
            subcategory: non_blank(self.subcategory.as_deref()),
            sort: SortSpec::parse(self.sort.as_deref())?,
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|n| *n >= 1)
}

fn parse_bound(field: &'static str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Some(value)),
        _ => Err(ValidationError::PriceBound { field, value: raw.to_string() }),
    }
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split('.').map(str::trim).filter(|id| !id.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(pairs: &[(&str, &str)]) -> Result<ProductQuery, ValidationError> {
        SearchParams::from_pairs(pairs.iter().copied()).validate(&PageLimits::default())
    }

    #[test]
    fn test_pagination_defaults() {
        let query = validate(&[]).unwrap();
        assert_eq!((query.page, query.per_page, query.skip()), (1, 10, 0));
    }

    #[test]
    fn test_skip_from_page_and_limit() {
        let query = validate(&[("page", "3"), ("per_page", "20")]).unwrap();
        assert_eq!(query.skip(), 40);
    }

    #[test]
    fn test_non_numeric_pagination_falls_back() {
        for (page, per_page) in [("abc", "x"), ("0", "0"), ("-2", "-5"), ("", " "), ("1.5", "2.5")] {
            let query = validate(&[("page", page), ("per_page", per_page)]).unwrap();
            assert_eq!(query.page, 1, "page {page:?}");
            assert_eq!(query.per_page, 10, "per_page {per_page:?}");
            assert_eq!(query.skip(), (query.page - 1) * query.per_page);
        }
    }

    #[test]
    fn test_per_page_clamped_to_max() {
        let query = validate(&[("per_page", "5000"), ("page", "2")]).unwrap();
        assert_eq!(query.per_page, 100);
        assert_eq!(query.skip(), 100);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let params = SearchParams::from_pairs([("store", "x"), ("page", "2")]);
        assert_eq!(params.page.as_deref(), Some("2"));
        assert_eq!(params, SearchParams { page: Some("2".into()), ..Default::default() });
    }

    #[test]
    fn test_sort_default_and_parse() {
        assert_eq!(validate(&[]).unwrap().sort, SortSpec::default());
        let sort = validate(&[("sort", "price.asc")]).unwrap().sort;
        assert_eq!(sort, SortSpec { field: "price".into(), direction: SortDirection::Asc });
    }

    #[test]
    fn test_sort_malformed() {
        assert!(matches!(validate(&[("sort", "price")]), Err(ValidationError::Sort(_))));
        assert!(matches!(validate(&[("sort", "price.up")]), Err(ValidationError::Sort(_))));
        assert!(matches!(validate(&[("sort", "color.asc")]), Err(ValidationError::SortField(_))));
    }

    #[test]
    fn test_id_lists() {
        let query = validate(&[("categories", "c1.c2..c3"), ("subcategories", "")]).unwrap();
        assert_eq!(query.category_ids, vec!["c1", "c2", "c3"]);
        assert!(query.subcategory_ids.is_empty());
        assert_eq!(query.filter().to_document(), json!({"categoryId": {"$in": ["c1", "c2", "c3"]}}));
    }

    #[test]
    fn test_price_range_parts() {
        let both = validate(&[("price_range", "10-50")]).unwrap();
        assert_eq!(both.filter().to_document(), json!({"price": {"$gte": 10.0, "$lte": 50.0}}));

        let min_only = validate(&[("price_range", "10-")]).unwrap();
        assert_eq!(min_only.filter().to_document(), json!({"price": {"$gte": 10.0}}));

        let max_only = validate(&[("price_range", "-50")]).unwrap();
        assert_eq!(max_only.filter().to_document(), json!({"price": {"$lte": 50.0}}));

        let open = validate(&[("price_range", "-")]).unwrap();
        assert!(open.price.is_open());
        assert_eq!(open.filter().to_document(), json!({}));
    }

    #[test]
    fn test_price_range_malformed() {
        assert!(matches!(validate(&[("price_range", "cheap-50")]), Err(ValidationError::PriceBound { .. })));
        assert!(matches!(validate(&[("price_range", "50")]), Err(ValidationError::PriceRange(_))));
        assert!(matches!(validate(&[("price_range", "60-50")]), Err(ValidationError::PriceRange(_))));
    }

    #[test]
    fn test_page_count_rounds_up() {
        let query = validate(&[("per_page", "2")]).unwrap();
        assert_eq!(query.page_count(0), 0);
        assert_eq!(query.page_count(3), 2);
        assert_eq!(query.page_count(4), 2);
    }

    #[test]
    fn test_category_filters() {
        let filters = CategoryFilters { sex: Some("men".into()), gte: Some("50".into()), ..Default::default() };
        let query = filters.validate().unwrap();
        assert_eq!(query.sex.as_deref(), Some("men"));
        assert_eq!(query.price, PriceRange { min: Some(50.0), max: None });
        assert_eq!(query.sort, SortSpec::default());

        let bad = CategoryFilters { lte: Some("lots".into()), ..Default::default() };
        assert!(matches!(bad.validate(), Err(ValidationError::PriceBound { field: "lte", .. })));

        let blank = CategoryFilters { sex: Some("  ".into()), gte: Some("".into()), ..Default::default() };
        let query = blank.validate().unwrap();
        assert!(query.sex.is_none());
        assert!(query.price.is_open());
    }
}
