//! Connection bootstrap and SQLite-backed document collections.

pub mod connection;
pub mod documents;
pub mod migrations;

pub use connection::{Database, StoreDb};
pub use documents::SqliteDocumentStore;
