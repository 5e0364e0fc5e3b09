//! Cache tools: tag invalidation and expiry purge.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shopfront_core::Catalog;

use super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateParams {
    /// Tag to invalidate, e.g. `products`, `categories`,
    /// `products:category:<slug>` or `product:<id>`.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateOutput {
    pub tag: String,
    /// Number of cached reads dropped.
    pub removed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of expired entries deleted.
    pub deleted: u64,
}

pub async fn invalidate_impl(catalog: &Catalog, params: CacheInvalidateParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.trim();
    if tag.is_empty() {
        return Err(ToolError::InvalidInput("tag must not be blank".to_string()).into());
    }

    let removed = catalog.invalidate_tag(tag).await?;
    json_result(&CacheInvalidateOutput { tag: tag.to_string(), removed })
}

pub async fn purge_impl(catalog: &Catalog) -> Result<CallToolResult, McpError> {
    let deleted = catalog.purge_expired().await?;
    json_result(&CachePurgeOutput { deleted })
}
