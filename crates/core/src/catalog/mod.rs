//! Storefront catalog: documents, pipelines and cached reads.

pub mod model;
pub mod pipelines;
pub mod seed;
pub mod service;

pub use model::{Category, CategoryGroup, Product, ProductHit, ProductImage, ProductView, Subcategory};
pub use seed::{SeedData, SeedReport, seed};
pub use service::{Catalog, CatalogSettings, category_products_tag, product_tag};
