//! Admin form draft and its validation boundary
//!
//! [`ProductDraft`] mirrors the admin dialog's form state: free-text fields
//! stay strings until [`ProductDraft::validate`] parses them into a
//! [`ValidatedProduct`]. Everything past that boundary is typed; nothing
//! downstream re-checks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Category, Product, ProductPatch, ProductRecord, UnknownCategory};

/// Image file attached to a draft, not yet uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// What happens to the product image when the draft is submitted
#[derive(Debug, Clone, PartialEq)]
pub enum ImageAction {
    /// Upload the attached file, then store its hosted URL
    Upload(ImageFile),
    /// Keep the already-stored URL unchanged
    Keep(String),
    /// Clear the stored URL; the explicit remove wins over an attached file
    Remove,
}

/// Raw admin form state
///
/// Numeric fields are strings here on purpose; they parse in
/// [`ProductDraft::validate`] and nowhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub original_price: String,
    pub discount_price: String,
    pub stock: String,
    pub rating: f32,
    pub is_on_sale: bool,
    pub is_new: bool,
    /// Newly attached file, if any
    pub image: Option<ImageFile>,
    /// URL already stored on the product being edited
    pub current_image_url: Option<String>,
    /// Explicitly clear the image on submit
    pub remove_image: bool,
}

impl ProductDraft {
    /// Pre-fill a draft from an existing product for the edit dialog
    pub fn from_product(product: &Product) -> Self {
        ProductDraft {
            name: product.name.clone(),
            brand: product.brand.clone().unwrap_or_default(),
            category: product.category.to_string(),
            description: product.description.clone().unwrap_or_default(),
            original_price: product.original_price.to_string(),
            discount_price: product
                .discount_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            rating: product.rating,
            is_on_sale: product.is_on_sale,
            is_new: product.is_new,
            image: None,
            current_image_url: (!product.image_url.is_empty())
                .then(|| product.image_url.clone()),
            remove_image: false,
        }
    }

    /// Parse and validate the form state
    ///
    /// Blank optionals become `None`, blank stock becomes 0, the category
    /// normalizes to its canonical lowercase form. A draft needs an image
    /// source unless the remove flag is set.
    pub fn validate(&self) -> Result<ValidatedProduct, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingCategory);
        }
        let category: Category = self.category.parse()?;

        let price_input = self.original_price.trim();
        if price_input.is_empty() {
            return Err(ValidationError::MissingPrice);
        }
        let original_price = parse_price(price_input)
            .ok_or_else(|| ValidationError::InvalidPrice(price_input.to_string()))?;

        let discount_price = match non_blank(&self.discount_price) {
            Some(raw) => Some(
                parse_price(raw)
                    .ok_or_else(|| ValidationError::InvalidDiscountPrice(raw.to_string()))?,
            ),
            None => None,
        };

        let stock = match non_blank(&self.stock) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidStock(raw.to_string()))?,
            None => 0,
        };

        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ValidationError::InvalidRating(self.rating));
        }

        let image = self.image_action()?;

        Ok(ValidatedProduct {
            name: name.to_string(),
            brand: non_blank(&self.brand).map(str::to_string),
            category,
            description: non_blank(&self.description).map(str::to_string),
            original_price,
            discount_price,
            stock,
            rating: self.rating,
            is_on_sale: self.is_on_sale,
            is_new: self.is_new,
            image,
        })
    }

    fn image_action(&self) -> Result<ImageAction, ValidationError> {
        if self.remove_image {
            return Ok(ImageAction::Remove);
        }
        if let Some(file) = &self.image {
            return Ok(ImageAction::Upload(file.clone()));
        }
        match self.current_image_url.as_deref() {
            Some(url) if !url.is_empty() => Ok(ImageAction::Keep(url.to_string())),
            _ => Err(ValidationError::MissingImage),
        }
    }
}

/// Draft that passed validation, ready to submit
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedProduct {
    pub name: String,
    pub brand: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    pub original_price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: u32,
    pub rating: f32,
    pub is_on_sale: bool,
    pub is_new: bool,
    pub image: ImageAction,
}

impl ValidatedProduct {
    /// Build the full create payload
    pub fn into_record(self, image_url: String, now: DateTime<Utc>) -> ProductRecord {
        ProductRecord {
            name: self.name,
            brand: self.brand,
            category: self.category,
            description: self.description,
            original_price: self.original_price,
            discount_price: self.discount_price,
            stock: self.stock,
            rating: self.rating,
            is_on_sale: self.is_on_sale,
            is_new: self.is_new,
            image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the partial update payload; the creation timestamp stays out
    pub fn into_patch(self, image_url: String, now: DateTime<Utc>) -> ProductPatch {
        ProductPatch {
            name: self.name,
            brand: self.brand,
            category: self.category,
            description: self.description,
            original_price: self.original_price,
            discount_price: self.discount_price,
            stock: self.stock,
            rating: self.rating,
            is_on_sale: self.is_on_sale,
            is_new: self.is_new,
            image_url,
            updated_at: now,
        }
    }
}

/// Validation failure, one variant per form rule
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Product name is required")]
    MissingName,
    #[error("Category is required")]
    MissingCategory,
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error("Original price is required")]
    MissingPrice,
    #[error("Invalid original price: {0}")]
    InvalidPrice(String),
    #[error("Invalid discount price: {0}")]
    InvalidDiscountPrice(String),
    #[error("Invalid stock count: {0}")]
    InvalidStock(String),
    #[error("Rating must be between 0 and 5, got {0}")]
    InvalidRating(f32),
    #[error("Product image is required")]
    MissingImage,
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_price(raw: &str) -> Option<Decimal> {
    let price: Decimal = raw.parse().ok()?;
    (price >= Decimal::ZERO).then_some(price)
}
