//! Admin dashboard data.

pub mod orders;

pub use orders::{Order, OrderStatus, OrdersPage, OrdersSource, OrdersSummary, PaymentMethod, StatusCounts, mock_orders};
