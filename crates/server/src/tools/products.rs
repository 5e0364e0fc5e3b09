//! Product tools: listing, lookup, category listing, related and search.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shopfront_core::Catalog;
use shopfront_core::query::{CategoryFilters, SearchParams};

use super::envelope_result;

/// Parameters for the product_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductGetParams {
    /// Product id.
    pub id: String,
}

/// Parameters for the products_by_category tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductsByCategoryParams {
    /// Category slug, e.g. `shoes`.
    pub slug: String,

    #[serde(flatten)]
    pub filters: CategoryFilters,
}

/// Parameters for the products_related tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductsRelatedParams {
    /// Product whose category neighbours are wanted.
    pub product_id: String,
}

/// Parameters for the products_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductsSearchParams {
    /// Text matched case-insensitively against product names.
    pub query: String,
}

pub async fn list_impl(catalog: &Catalog, params: SearchParams) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_products(&params).await)
}

pub async fn get_impl(catalog: &Catalog, params: ProductGetParams) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_product(&params.id).await)
}

pub async fn by_category_impl(
    catalog: &Catalog, params: ProductsByCategoryParams,
) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_products_by_category(&params.slug, &params.filters).await)
}

pub async fn related_impl(catalog: &Catalog, params: ProductsRelatedParams) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_related_products(&params.product_id).await)
}

pub async fn search_impl(catalog: &Catalog, params: ProductsSearchParams) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_filtered_products(&params.query).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{body, seeded_catalog};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_paginates() {
        let catalog = seeded_catalog().await;
        let params = SearchParams { per_page: Some("2".into()), sort: Some("price.asc".into()), ..Default::default() };

        let result = list_impl(&catalog, params).await.unwrap();
        assert!(!result.is_error.unwrap_or(false));

        let body = body(&result);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["pageCount"], 2);
        assert_eq!(body["data"]["data"][0]["_id"], "p2");
        assert_eq!(body["data"]["data"][1]["categoryName"], "Shoes");
    }

    #[tokio::test]
    async fn test_list_with_bad_sort_is_empty_success() {
        let catalog = seeded_catalog().await;
        let params = SearchParams { sort: Some("price".into()), ..Default::default() };

        let body = body(&list_impl(&catalog, params).await.unwrap());
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!({"data": [], "pageCount": 0}));
    }

    #[tokio::test]
    async fn test_get_missing_is_tool_error() {
        let catalog = seeded_catalog().await;
        let result = get_impl(&catalog, ProductGetParams { id: "nope".into() }).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(body(&result)["success"], false);
    }

    #[tokio::test]
    async fn test_by_category_flattened_filters() {
        let catalog = seeded_catalog().await;
        let params: ProductsByCategoryParams =
            serde_json::from_value(json!({"slug": "shoes", "sex": "men", "gte": "50"})).unwrap();
        assert_eq!(params.filters.sex.as_deref(), Some("men"));

        let body = body(&by_category_impl(&catalog, params).await.unwrap());
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["_id"], "p1");
    }

    #[tokio::test]
    async fn test_related_and_search() {
        let catalog = seeded_catalog().await;

        let related = body(&related_impl(&catalog, ProductsRelatedParams { product_id: "p1".into() }).await.unwrap());
        assert_eq!(related["data"].as_array().unwrap().len(), 1);
        assert_eq!(related["data"][0]["_id"], "p2");

        let search = body(&search_impl(&catalog, ProductsSearchParams { query: "SNEAKER".into() }).await.unwrap());
        assert_eq!(search["data"][0]["category"], "Shoes");
        assert_eq!(search["data"][0]["products"].as_array().unwrap().len(), 2);
    }
}
