//! Product Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Stock level below which a product counts as low stock (exclusive)
pub const LOW_STOCK_THRESHOLD: u32 = 3;

/// Product entity
///
/// Materialized from the remote store. The record body never carries the id;
/// the store key is the identity and is attached during materialization, so
/// `id` is `None` only for a record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub brand: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    #[serde(default)]
    pub stock: u32,
    /// Star rating 0-5; stored ratings may be fractional (e.g. 4.8)
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default)]
    pub is_new: bool,
    /// Empty string means no image
    #[serde(default)]
    pub image_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Price the customer actually pays (discount if present)
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.original_price)
    }

    /// Derive the stock status shown in the admin table
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }
}

/// Stock status derived from the stock count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Active,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn from_stock(stock: u32) -> Self {
        match stock {
            0 => StockStatus::OutOfStock,
            s if s < LOW_STOCK_THRESHOLD => StockStatus::LowStock,
            _ => StockStatus::Active,
        }
    }

    /// Display label for the admin table status column
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::Active => "Active",
            StockStatus::LowStock => "Low Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }
}

/// Create payload written on append
///
/// Blank optionals serialize as explicit JSON nulls: the store deletes a
/// child on null, which is also how a later update clears one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub brand: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    pub stock: u32,
    pub rating: f32,
    pub is_on_sale: bool,
    pub is_new: bool,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Update payload written on partial update
///
/// Same shape as [`ProductRecord`] minus `createdAt`, so an update can never
/// touch the creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: String,
    pub brand: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub discount_price: Option<Decimal>,
    pub stock: u32,
    pub rating: f32,
    pub is_on_sale: bool,
    pub is_new: bool,
    pub image_url: String,
    pub updated_at: DateTime<Utc>,
}
