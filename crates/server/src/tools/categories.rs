//! Category tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shopfront_core::Catalog;

use super::envelope_result;

/// Parameters for the subcategories_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubcategoriesListParams {
    /// Slug of the parent category.
    pub category_slug: String,
}

pub async fn list_impl(catalog: &Catalog) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_categories().await)
}

pub async fn subcategories_impl(
    catalog: &Catalog, params: SubcategoriesListParams,
) -> Result<CallToolResult, McpError> {
    envelope_result(&catalog.get_subcategories(&params.category_slug).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{body, seeded_catalog};

    #[tokio::test]
    async fn test_categories_sorted_by_name() {
        let catalog = seeded_catalog().await;
        let body = body(&list_impl(&catalog).await.unwrap());
        assert_eq!(body["data"][0]["slug"], "bags");
        assert_eq!(body["data"][1]["slug"], "shoes");
    }

    #[tokio::test]
    async fn test_subcategories() {
        let catalog = seeded_catalog().await;
        let params = SubcategoriesListParams { category_slug: "shoes".into() };
        let body = body(&subcategories_impl(&catalog, params).await.unwrap());
        assert_eq!(body["data"][0]["slug"], "sneakers");

        let params = SubcategoriesListParams { category_slug: "hats".into() };
        let result = subcategories_impl(&catalog, params).await.unwrap();
        assert!(!result.is_error.unwrap_or(false));
    }
}
