//! admin_orders tool implementation.
//!
//! Renders the admin orders table from caller-supplied orders, or from the
//! bundled sample set when none are given.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shopfront_core::admin::{Order, OrderStatus, OrdersPage, OrdersSource, OrdersSummary};

use crate::error::ToolError;

/// Parameters for the admin_orders tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AdminOrdersParams {
    /// Only show orders with this status.
    #[serde(default)]
    pub status: Option<OrderStatus>,

    /// Live orders to render. The sample set is used when omitted.
    #[serde(default)]
    pub orders: Option<Vec<Order>>,
}

/// Output from the admin_orders tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdminOrdersOutput {
    pub summary: OrdersSummary,
    pub rows: Vec<Order>,
}

pub async fn orders_impl(params: AdminOrdersParams) -> Result<CallToolResult, McpError> {
    let source = match params.orders {
        Some(orders) => OrdersSource::Live(orders),
        None => OrdersSource::Mock,
    };
    let page = OrdersPage::build(source, params.status)?;
    let table = page.to_markdown();

    let output = AdminOrdersOutput { summary: page.summary, rows: page.rows };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json), Content::text(table)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::body;

    #[tokio::test]
    async fn test_mock_orders() {
        let result = orders_impl(AdminOrdersParams::default()).await.unwrap();
        assert_eq!(result.content.len(), 2);

        let body = body(&result);
        assert_eq!(body["summary"]["count"], 8);
        assert_eq!(body["rows"][0]["id"], "ORD-1005");

        let table = &result.content[1].as_text().unwrap().text;
        assert!(table.starts_with("| Order | Customer |"));
    }

    #[tokio::test]
    async fn test_live_orders_filtered() {
        let params: AdminOrdersParams = serde_json::from_value(serde_json::json!({
            "status": "failed",
            "orders": [
                {"id": "A-1", "customerName": "Ana", "email": "ana@example.com", "orderDate": "2024-06-01",
                 "amount": 12.5, "paymentMethod": "paypal", "status": "failed", "items": 1},
                {"id": "A-2", "customerName": "Ben", "email": "ben@example.com", "orderDate": "2024-06-02",
                 "amount": 20, "paymentMethod": "credit_card", "status": "success", "items": 2}
            ]
        }))
        .unwrap();

        let body = body(&orders_impl(params).await.unwrap());
        assert_eq!(body["summary"]["count"], 1);
        assert_eq!(body["summary"]["byStatus"]["failed"], 1);
        assert_eq!(body["rows"][0]["trackingNumber"], serde_json::Value::Null);
    }
}
