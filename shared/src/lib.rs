//! Shared types for the Sole storefront
//!
//! Domain types used by both the client crate and the mock backend:
//! product and category models, the admin form draft with its validation
//! boundary, and pure catalog operations (stats, search, sort).

pub mod catalog;
pub mod draft;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use catalog::{CatalogStats, SortBy, filter_by_category, filter_products, sort_products};
pub use draft::{ImageAction, ImageFile, ProductDraft, ValidatedProduct, ValidationError};
pub use models::{
    Category, LOW_STOCK_THRESHOLD, Product, ProductPatch, ProductRecord, StockStatus,
    UnknownCategory,
};
