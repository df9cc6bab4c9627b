//! Cart line items and the persisted cart snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LineItemId, ProductId};
use super::product::ProductSummary;

/// One entry in the cart: a product snapshot and the requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub product: ProductSummary,
    /// Always at least 1 while the item is in the cart.
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    /// Create a line item with a freshly generated id, stamped now.
    #[must_use]
    pub fn new(product: ProductSummary, quantity: u32) -> Self {
        Self {
            id: LineItemId::generate(),
            product_id: product.id.clone(),
            product,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Snapshot price multiplied by `quantity`, or `None` if that does not
    /// fit in a `Decimal`.
    #[must_use]
    pub fn checked_total_for(&self, quantity: u32) -> Option<Decimal> {
        self.product.price.checked_mul(Decimal::from(quantity))
    }

    /// Snapshot price multiplied by quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.checked_total_for(self.quantity).unwrap_or(Decimal::MAX)
    }
}

/// Sum of the line totals of `items`, saturating at `Decimal::MAX`.
#[must_use]
pub fn subtotal_of(items: &[CartLineItem]) -> Decimal {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()))
        .unwrap_or(Decimal::MAX)
}

/// The JSON document written to the durable store: `{"items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default)]
    pub items: Vec<CartLineItem>,
}

impl CartSnapshot {
    #[must_use]
    pub const fn new(items: Vec<CartLineItem>) -> Self {
        Self { items }
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price * quantity` over the captured snapshots.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal_of(&self.items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_uses_product_id() {
        let item = CartLineItem::new(ProductSummary::new("P1", "Widget", Decimal::new(10, 0)), 2);
        assert_eq!(item.product_id.as_str(), "P1");
        assert_eq!(item.line_total(), Decimal::new(20, 0));
    }

    #[test]
    fn test_snapshot_totals() {
        let snapshot = CartSnapshot::new(vec![
            CartLineItem::new(ProductSummary::new("P1", "A", Decimal::new(1050, 2)), 2),
            CartLineItem::new(ProductSummary::new("P2", "B", Decimal::new(5, 0)), 3),
        ]);
        assert_eq!(snapshot.item_count(), 5);
        assert_eq!(snapshot.subtotal(), Decimal::new(36, 0));
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let price = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let huge = ProductSummary::new("P1", "Yacht", price);
        let item = CartLineItem::new(huge, u32::MAX);
        assert_eq!(item.checked_total_for(u32::MAX), None);
        assert_eq!(item.line_total(), Decimal::MAX);

        let snapshot = CartSnapshot::new(vec![item.clone(), item]);
        assert_eq!(snapshot.subtotal(), Decimal::MAX);
    }

    #[test]
    fn test_snapshot_layout_is_camel_case() {
        let item = CartLineItem::new(ProductSummary::new("P1", "Widget", Decimal::new(10, 0)), 1);
        let json = serde_json::to_value(CartSnapshot::new(vec![item])).unwrap();
        let entry = &json["items"][0];
        assert!(entry["id"].is_string());
        assert_eq!(entry["productId"], "P1");
        assert_eq!(entry["quantity"], 1);
        assert!(entry["addedAt"].is_string());
        assert_eq!(entry["product"]["title"], "Widget");
    }

    #[test]
    fn test_snapshot_missing_items_is_empty() {
        let snapshot: CartSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.items.is_empty());
    }
}
