//! Display models rendered from cart state and notifications.

use std::fmt;

use rust_decimal::Decimal;
use shopfront_core::{CartLineItem, LineItemId, Price, ProductId, subtotal_of};

use super::events::{CartAction, CartEvent, EventData};

/// Header badge showing the total quantity in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartBadge {
    pub count: u64,
    /// Hidden while the cart is empty.
    pub visible: bool,
}

impl CartBadge {
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self {
            count,
            visible: count > 0,
        }
    }

    #[must_use]
    pub fn from_items(items: &[CartLineItem]) -> Self {
        Self::new(items.iter().map(|item| u64::from(item.quantity)).sum())
    }
}

impl From<&CartEvent> for CartBadge {
    fn from(event: &CartEvent) -> Self {
        Self::from_items(&event.items)
    }
}

/// Line item display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: format_price(Decimal::ZERO),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn from_items(items: &[CartLineItem]) -> Self {
        if items.is_empty() {
            return Self::empty();
        }
        Self {
            items: items.iter().map(CartItemView::from).collect(),
            subtotal: format_price(subtotal_of(items)),
            item_count: items.iter().map(|item| u64::from(item.quantity)).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn format_price(amount: Decimal) -> String {
    Price::usd(amount).display()
}

impl From<&CartLineItem> for CartItemView {
    fn from(item: &CartLineItem) -> Self {
        Self {
            id: item.id.clone(),
            product_id: item.product_id.clone(),
            title: item.product.title.clone(),
            quantity: item.quantity,
            price: format_price(item.product.price),
            line_price: format_price(item.line_total()),
        }
    }
}

impl fmt::Display for CartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Your cart is empty");
        }
        for item in &self.items {
            writeln!(
                f,
                "{:<40} {:>3} x {:>9} = {:>10}  [{}]",
                item.title, item.quantity, item.price, item.line_price, item.id
            )?;
        }
        writeln!(f, "Subtotal ({} items): {}", self.item_count, self.subtotal)
    }
}

/// Transient "added to cart" notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartToast {
    pub heading: &'static str,
    pub title: String,
}

impl CartToast {
    /// Build a toast for an `add` notification; other actions show none.
    #[must_use]
    pub fn from_event(event: &CartEvent) -> Option<Self> {
        match (&event.action, &event.data) {
            (CartAction::Add, EventData::Product(product)) => Some(Self {
                heading: "Added to cart!",
                title: product.title.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CartToast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.heading, self.title)
    }
}
