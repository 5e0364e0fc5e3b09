//! Admin orders table.
//!
//! Orders are display data: they come either from a caller (live) or from the
//! bundled sample set, and are rendered as a summary plus a Markdown table.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

const MOCK_ORDERS: &str = include_str!("../../fixtures/orders.json");

const TABLE_HEADER: &str = "| Order | Customer | Email | Date | Amount | Payment | Status | Items | Tracking |\n";

/// Placeholder for a missing tracking number.
pub const NO_TRACKING: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Success => "Success",
            OrderStatus::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Paypal,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::Paypal => "PayPal",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::CashOnDelivery => "Cash on Delivery",
        }
    }
}

/// One row of the orders table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    pub order_date: NaiveDate,
    pub amount: f64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub items: u32,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

/// The bundled sample orders.
pub fn mock_orders() -> Result<Vec<Order>, Error> {
    serde_json::from_str(MOCK_ORDERS).map_err(Error::from)
}

/// Where the table's rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum OrdersSource {
    Live(Vec<Order>),
    Mock,
}

impl OrdersSource {
    pub fn load(self) -> Result<Vec<Order>, Error> {
        match self {
            OrdersSource::Live(orders) => Ok(orders),
            OrdersSource::Mock => mock_orders(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub success: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: OrderStatus) {
        let slot = match status {
            OrderStatus::Pending => &mut self.pending,
            OrderStatus::Processing => &mut self.processing,
            OrderStatus::Success => &mut self.success,
            OrderStatus::Failed => &mut self.failed,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrdersSummary {
    pub count: usize,
    /// Sum of amounts, rounded to cents.
    pub total_amount: f64,
    pub by_status: StatusCounts,
}

/// Orders table: rows newest first plus a summary over those rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrdersPage {
    pub rows: Vec<Order>,
    pub summary: OrdersSummary,
}

impl OrdersPage {
    /// Load rows from `source`, keep those with `status` (all when `None`)
    /// and order them by date, newest first, then by id.
    pub fn build(source: OrdersSource, status: Option<OrderStatus>) -> Result<Self, Error> {
        let mut rows: Vec<Order> =
            source.load()?.into_iter().filter(|o| status.is_none_or(|s| o.status == s)).collect();
        rows.sort_by(|a, b| b.order_date.cmp(&a.order_date).then_with(|| a.id.cmp(&b.id)));

        let mut by_status = StatusCounts::default();
        let mut total = 0.0;
        for order in &rows {
            by_status.bump(order.status);
            total += order.amount;
        }
        let summary = OrdersSummary { count: rows.len(), total_amount: (total * 100.0).round() / 100.0, by_status };
        Ok(Self { rows, summary })
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from(TABLE_HEADER);
        out.push_str("|---|---|---|---|---:|---|---|---:|---|\n");
        for order in &self.rows {
            let cells = [
                cell(&order.id),
                cell(&order.customer_name),
                cell(&order.email),
                order.order_date.format("%Y-%m-%d").to_string(),
                format!("${:.2}", order.amount),
                order.payment_method.label().to_string(),
                order.status.label().to_string(),
                order.items.to_string(),
                order.tracking_number.as_deref().map(cell).unwrap_or_else(|| NO_TRACKING.to_string()),
            ];
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");
        }
        out
    }
}

/// Keep a value on one table row: escape pipes and flatten line breaks.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
