//! Category Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of shoe categories
///
/// Stored lowercase on the wire; parsing is case-insensitive so form input
/// like "Athletic" normalizes to the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Formal,
    Athletic,
    Boots,
    Women,
    Men,
    Kids,
    Casual,
}

/// Category string that does not match any known category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    /// All categories, in storefront display order
    pub const ALL: [Category; 7] = [
        Category::Formal,
        Category::Athletic,
        Category::Boots,
        Category::Women,
        Category::Men,
        Category::Kids,
        Category::Casual,
    ];

    /// Canonical lowercase form, as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Formal => "formal",
            Category::Athletic => "athletic",
            Category::Boots => "boots",
            Category::Women => "women",
            Category::Men => "men",
            Category::Kids => "kids",
            Category::Casual => "casual",
        }
    }

    /// Capitalized label for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Formal => "Formal",
            Category::Athletic => "Athletic",
            Category::Boots => "Boots",
            Category::Women => "Women",
            Category::Men => "Men",
            Category::Kids => "Kids",
            Category::Casual => "Casual",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formal" => Ok(Category::Formal),
            "athletic" => Ok(Category::Athletic),
            "boots" => Ok(Category::Boots),
            "women" => Ok(Category::Women),
            "men" => Ok(Category::Men),
            "kids" => Ok(Category::Kids),
            "casual" => Ok(Category::Casual),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
