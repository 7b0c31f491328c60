//! Data models
//!
//! Shared between the client crate and the mock backend. Wire types use
//! camelCase field names to match the hosted store's records; the store key
//! is the product identity and lives outside the record body.

pub mod category;
pub mod product;

// Re-exports
pub use category::*;
pub use product::*;
