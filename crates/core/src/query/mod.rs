//! Query construction and evaluation.
//!
//! - [`params`]: flat search parameters and the validation step
//! - [`filter`]: filter documents (`$in`, `$gte`, `$lte`, ...)
//! - [`pipeline`]: ordered aggregation stages
//! - [`engine`]: in-process pipeline evaluation

pub mod engine;
pub mod filter;
pub mod params;
pub mod pipeline;

pub use filter::{Condition, Filter};
pub use params::{
    CategoryFilters, CategoryQuery, PageLimits, PriceRange, ProductQuery, SearchParams, SortSpec, ValidationError,
};
pub use pipeline::{Pipeline, ProjectField, SortDirection, Stage};
