//! Core types and shared functionality for shopfront.
//!
//! This crate provides:
//! - Catalog reads over a document store backed by SQLite
//! - Search-parameter validation, filters and aggregation pipelines
//! - A tag-invalidated read cache
//! - The response envelope shared by every read
//! - The admin orders table
//! - Unified error types and configuration

pub mod admin;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod query;
pub mod store;

pub use cache::{CacheKey, CacheOptions, CacheService};
pub use catalog::{Catalog, CatalogSettings};
pub use config::{AppConfig, ConfigError};
pub use envelope::{Envelope, Page};
pub use error::Error;
pub use store::DocumentStore;
