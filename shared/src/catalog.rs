//! Pure catalog operations
//!
//! Statistics, search, category filtering, and sorting over a materialized
//! product list. Everything here is pure; the live list itself is owned by
//! the subscription in the client crate.

use std::cmp::Ordering;

use crate::models::{Category, LOW_STOCK_THRESHOLD, Product};

/// Summary statistics over the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub on_sale: usize,
    /// Products with stock above zero but below the low-stock threshold
    pub low_stock: usize,
    pub new_arrivals: usize,
}

impl CatalogStats {
    /// Compute stats from a product list
    pub fn compute(products: &[Product]) -> Self {
        CatalogStats {
            total: products.len(),
            on_sale: products.iter().filter(|p| p.is_on_sale).count(),
            low_stock: products
                .iter()
                .filter(|p| p.stock > 0 && p.stock < LOW_STOCK_THRESHOLD)
                .count(),
            new_arrivals: products.iter().filter(|p| p.is_new).count(),
        }
    }
}

/// Case-insensitive substring search on name or category
///
/// An empty query returns the full list unchanged.
pub fn filter_products(products: &[Product], query: &str) -> Vec<Product> {
    if query.is_empty() {
        return products.to_vec();
    }
    let needle = query.to_lowercase();
    products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle) || p.category.as_str().contains(&needle))
        .cloned()
        .collect()
}

/// Products in exactly one category
pub fn filter_by_category(products: &[Product], category: Category) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.category == category)
        .cloned()
        .collect()
}

/// Sort order for the shop grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Catalog order as delivered by the store
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    Rating,
    Newest,
}

/// Sort a product list for display
pub fn sort_products(products: &mut [Product], by: SortBy) {
    match by {
        SortBy::Featured => {}
        SortBy::PriceLowHigh => products.sort_by_key(|p| p.effective_price()),
        SortBy::PriceHighLow => {
            products.sort_by(|a, b| b.effective_price().cmp(&a.effective_price()))
        }
        SortBy::Rating => products.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
        }),
        // Products without a creation timestamp sort last
        SortBy::Newest => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn product(name: &str, category: Category, stock: u32) -> Product {
        Product {
            id: Some(format!("id-{name}")),
            name: name.to_string(),
            brand: None,
            category,
            description: None,
            original_price: Decimal::new(10000, 2),
            discount_price: None,
            stock,
            rating: 0.0,
            is_on_sale: false,
            is_new: false,
            image_url: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_stats_counts() {
        let mut runner = product("Trail Runner", Category::Athletic, 2);
        runner.is_new = true;
        let mut oxford = product("Oxford", Category::Formal, 0);
        oxford.is_on_sale = true;
        let boot = product("Hiker", Category::Boots, 10);

        let stats = CatalogStats::compute(&[runner, oxford, boot]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.on_sale, 1);
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.new_arrivals, 1);
    }

    #[test]
    fn test_stats_low_stock_excludes_zero_and_threshold() {
        let products = vec![
            product("a", Category::Men, 0),
            product("b", Category::Men, 1),
            product("c", Category::Men, 2),
            product("d", Category::Men, 3),
        ];
        let stats = CatalogStats::compute(&products);
        assert_eq!(stats.low_stock, 2);
    }

    #[test]
    fn test_stats_idempotent() {
        let products = vec![product("a", Category::Men, 1)];
        assert_eq!(
            CatalogStats::compute(&products),
            CatalogStats::compute(&products)
        );
    }

    #[test]
    fn test_filter_empty_query_is_identity() {
        let products = vec![
            product("Trail Runner", Category::Athletic, 5),
            product("Oxford", Category::Formal, 5),
        ];
        let filtered = filter_products(&products, "");
        assert_eq!(filtered, products);
    }

    #[test]
    fn test_filter_matches_name_and_category_case_insensitive() {
        let products = vec![
            product("Trail Runner", Category::Athletic, 5),
            product("Oxford", Category::Formal, 5),
            product("Rain Boot", Category::Boots, 5),
        ];

        let by_name = filter_products(&products, "tRaIl");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Trail Runner");

        let by_category = filter_products(&products, "BOOT");
        // "Rain Boot" by name and category, nothing else by category "boots"
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "Rain Boot");

        let formal = filter_products(&products, "formal");
        assert_eq!(formal.len(), 1);
        assert_eq!(formal[0].name, "Oxford");

        assert!(filter_products(&products, "sandal").is_empty());
    }

    #[test]
    fn test_filter_by_category_exact() {
        let products = vec![
            product("Trail Runner", Category::Athletic, 5),
            product("Court Classic", Category::Athletic, 5),
            product("Oxford", Category::Formal, 5),
        ];
        let athletic = filter_by_category(&products, Category::Athletic);
        assert_eq!(athletic.len(), 2);
    }

    #[test]
    fn test_sort_by_price_uses_effective_price() {
        let mut cheap = product("Cheap", Category::Men, 1);
        cheap.original_price = Decimal::new(5000, 2);
        let mut discounted = product("Discounted", Category::Men, 1);
        discounted.original_price = Decimal::new(20000, 2);
        discounted.discount_price = Some(Decimal::new(3000, 2));
        let mut full = product("Full", Category::Men, 1);
        full.original_price = Decimal::new(10000, 2);

        let mut products = vec![cheap, discounted, full];
        sort_products(&mut products, SortBy::PriceLowHigh);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Discounted", "Cheap", "Full"]);

        sort_products(&mut products, SortBy::PriceHighLow);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Full", "Cheap", "Discounted"]);
    }

    #[test]
    fn test_sort_newest_puts_undated_last() {
        let mut old = product("Old", Category::Men, 1);
        old.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut new = product("New", Category::Men, 1);
        new.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let undated = product("Undated", Category::Men, 1);

        let mut products = vec![old, undated, new];
        sort_products(&mut products, SortBy::Newest);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["New", "Old", "Undated"]);
    }
}
