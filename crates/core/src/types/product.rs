//! Catalog product records and the snapshot captured into cart line items.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::Price;

/// A full catalog product record.
///
/// Prices serialize as JSON numbers so records stay interchangeable with the
/// page-side catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub brand: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    /// Discount percentage relative to `original_price`.
    #[serde(default)]
    pub discount: u8,
    pub rating: f64,
    pub review_count: u32,
    #[serde(default)]
    pub prime: bool,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub best_seller: bool,
    #[serde(default)]
    pub new_arrival: bool,
    pub description: String,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
}

impl Product {
    /// Capture the add-time snapshot stored in a cart line item.
    ///
    /// Everything other than id, title and price is carried through as
    /// opaque attributes.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        let mut attributes = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for key in ["id", "title", "price"] {
            attributes.remove(key);
        }

        ProductSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            price: self.price,
            attributes,
        }
    }

    /// Case-insensitive substring match against title, brand or description.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.brand.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Fixed-shape product snapshot stored inside a cart line item.
///
/// Captured once when the product is added and never re-fetched, so the
/// cart subtotal always reflects add-time prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Catalog attributes passed through opaquely (brand, category, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ProductSummary {
    /// Create a snapshot with no extra attributes.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            attributes: Map::new(),
        }
    }

    /// Attach an opaque catalog attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Unit price in the default currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        product.summary()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headphones() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": "B07X12345",
            "title": "Premium Bluetooth Headphones",
            "brand": "AudioTech",
            "category": "electronics",
            "price": 129.99,
            "originalPrice": 199.99,
            "discount": 35,
            "rating": 4.5,
            "reviewCount": 2847,
            "prime": true,
            "inStock": true,
            "bestSeller": true,
            "description": "Premium wireless headphones with active noise cancellation",
            "specifications": { "color": "Black" }
        }))
        .unwrap()
    }

    #[test]
    fn test_product_deserializes_page_shape() {
        let product = headphones();
        assert_eq!(product.price, Decimal::new(12999, 2));
        assert_eq!(product.original_price, Some(Decimal::new(19999, 2)));
        assert!(product.best_seller);
        assert!(!product.new_arrival);
    }

    #[test]
    fn test_summary_keeps_attributes() {
        let summary = headphones().summary();
        assert_eq!(summary.id.as_str(), "B07X12345");
        assert_eq!(summary.price, Decimal::new(12999, 2));
        assert_eq!(summary.attributes["brand"], "AudioTech");
        assert!(!summary.attributes.contains_key("price"));
        assert!(!summary.attributes.contains_key("id"));
    }

    #[test]
    fn test_summary_serializes_flat() {
        let summary = ProductSummary::new("P1", "Widget", Decimal::new(10, 0))
            .with_attribute("color", "red");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "P1", "title": "Widget", "price": 10.0, "color": "red" })
        );
    }

    #[test]
    fn test_summary_accepts_missing_title() {
        let summary: ProductSummary =
            serde_json::from_value(serde_json::json!({ "id": "P1", "price": 10 })).unwrap();
        assert_eq!(summary.title, "");
        assert_eq!(summary.price, Decimal::new(10, 0));
    }

    #[test]
    fn test_matches_search_is_case_insensitive() {
        let product = headphones();
        assert!(product.matches_search("audiotech"));
        assert!(product.matches_search("NOISE"));
        assert!(!product.matches_search("keyboard"));
    }
}
