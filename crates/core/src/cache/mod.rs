//! Tag-addressable read cache.
//!
//! Cached reads are stored in the shared SQLite database:
//!
//! - Keys are ordered string parts hashed with SHA-256
//! - Every entry carries a fixed revalidation window
//! - Tags group entries for explicit invalidation

pub mod entries;
pub mod hash;
pub mod service;

pub use hash::CacheKey;
pub use service::{CacheOptions, CacheService};
