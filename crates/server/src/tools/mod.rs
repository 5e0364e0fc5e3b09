//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shopfront server. Catalog
//! tools reply with the JSON envelope; a failure envelope is flagged as a
//! tool error.

pub mod cache;
pub mod categories;
pub mod orders;
pub mod products;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shopfront_core::Envelope;

use crate::error::ToolError;

/// Render an envelope as the tool result.
pub fn envelope_result<T: Serialize>(envelope: &Envelope<T>) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(envelope).map_err(ToolError::from)?;
    if envelope.is_success() {
        Ok(CallToolResult::success(vec![Content::text(json)]))
    } else {
        Ok(CallToolResult::error(vec![Content::text(json)]))
    }
}

/// Render a plain output struct as the tool result.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
