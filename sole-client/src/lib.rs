//! Sole Client - async client for the storefront's hosted services
//!
//! Talks to the three services behind the shoe store: the realtime database
//! holding the product collection, the email/password auth service, and the
//! image upload host. The catalog is mirrored locally through a live
//! subscription; product create/update/delete runs through an explicit
//! mutation state machine that sequences the optional image upload before
//! the single collection write.

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod mutation;
pub mod rtdb;
pub mod upload;

pub use auth::{AuthClient, AuthSession};
pub use catalog::{CatalogFeed, CatalogState};
pub use client::StoreClient;
pub use config::StoreConfig;
pub use error::{ClientError, ClientResult};
pub use mutation::{MutationOutcome, MutationState, ProductMutator};
pub use rtdb::{RealtimeDb, Subscription};
pub use upload::ImageUploader;

// Re-export shared types for convenience
pub use shared::{
    CatalogStats, Category, ImageFile, Product, ProductDraft, SortBy, StockStatus, ValidationError,
};
