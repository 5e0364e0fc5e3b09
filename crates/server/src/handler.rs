//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    cache::{self as cache_tools, CacheInvalidateParams},
    categories::{self, SubcategoriesListParams},
    orders::{AdminOrdersParams, orders_impl},
    products::{self, ProductGetParams, ProductsByCategoryParams, ProductsRelatedParams, ProductsSearchParams},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use shopfront_core::Catalog;
use shopfront_core::query::SearchParams;

/// The main MCP server handler for shopfront.
#[derive(Clone)]
pub struct ShopfrontServer {
    tool_router: ToolRouter<Self>,
    catalog: Arc<Catalog>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShopfrontServer {
    /// Create a new server handler over `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        Self { tool_router: Self::tool_router(), catalog: Arc::new(catalog) }
    }

    #[tool(description = "List products. Accepts page, per_page, sort (field.asc|desc), dot-joined categories and \
                          subcategories ids, and price_range (min-max). Malformed parameters yield an empty page.")]
    async fn products_list(&self, params: Parameters<SearchParams>) -> Result<CallToolResult, McpError> {
        products::list_impl(&self.catalog, params.0).await
    }

    #[tool(description = "Get one product by id, with its category and subcategory names.")]
    async fn product_get(&self, params: Parameters<ProductGetParams>) -> Result<CallToolResult, McpError> {
        products::get_impl(&self.catalog, params.0).await
    }

    #[tool(description = "List products of a category by slug, optionally filtered by sex, gte/lte price bounds \
                          and subcategory slug, sorted by field.asc|desc.")]
    async fn products_by_category(
        &self, params: Parameters<ProductsByCategoryParams>,
    ) -> Result<CallToolResult, McpError> {
        products::by_category_impl(&self.catalog, params.0).await
    }

    #[tool(description = "Newest products from the same category as the given product, excluding it.")]
    async fn products_related(&self, params: Parameters<ProductsRelatedParams>) -> Result<CallToolResult, McpError> {
        products::related_impl(&self.catalog, params.0).await
    }

    #[tool(description = "Search products by name (case-insensitive, literal match), grouped by category.")]
    async fn products_search(&self, params: Parameters<ProductsSearchParams>) -> Result<CallToolResult, McpError> {
        products::search_impl(&self.catalog, params.0).await
    }

    #[tool(description = "List all categories, sorted by name.")]
    async fn categories_list(&self) -> Result<CallToolResult, McpError> {
        categories::list_impl(&self.catalog).await
    }

    #[tool(description = "List the subcategories of a category, by category slug.")]
    async fn subcategories_list(
        &self, params: Parameters<SubcategoriesListParams>,
    ) -> Result<CallToolResult, McpError> {
        categories::subcategories_impl(&self.catalog, params.0).await
    }

    /// Render the admin orders table.
    ///
    /// Uses the supplied orders, or the bundled sample orders when none are given.
    #[tool(description = "Admin orders table: summary plus a Markdown table. Pass orders to render live data; \
                          the sample set is used otherwise. Optional status filter.")]
    async fn admin_orders(&self, params: Parameters<AdminOrdersParams>) -> Result<CallToolResult, McpError> {
        orders_impl(params.0).await
    }

    #[tool(description = "Invalidate cached reads by tag (products, categories, subcategories, \
                          products:category:<slug>, product:<id>).")]
    async fn cache_invalidate(&self, params: Parameters<CacheInvalidateParams>) -> Result<CallToolResult, McpError> {
        cache_tools::invalidate_impl(&self.catalog, params.0).await
    }

    #[tool(description = "Delete cached reads whose revalidation window has passed.")]
    async fn cache_purge(&self) -> Result<CallToolResult, McpError> {
        cache_tools::purge_impl(&self.catalog).await
    }
}

impl ServerHandler for ShopfrontServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shopfront".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::AppConfig;

    #[test]
    fn test_all_tools_registered() {
        let config = AppConfig { db_path: ":memory:".into(), ..Default::default() };
        let server = ShopfrontServer::new(Catalog::open(&config));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "admin_orders",
                "cache_invalidate",
                "cache_purge",
                "categories_list",
                "product_get",
                "products_by_category",
                "products_list",
                "products_related",
                "products_search",
                "subcategories_list",
            ]
        );
    }

    #[test]
    fn test_server_info() {
        let config = AppConfig { db_path: ":memory:".into(), ..Default::default() };
        let info = ShopfrontServer::new(Catalog::open(&config)).get_info();
        assert_eq!(info.server_info.name, "shopfront");
    }
}
