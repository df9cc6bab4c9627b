//! Product listing filters.

use rust_decimal::Decimal;
use shopfront_core::Product;

/// Filters accepted by [`MockCatalog::fetch_products`](super::MockCatalog::fetch_products).
///
/// Unset fields do not filter. A `limit` of zero means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: Option<usize>,
}

impl ProductFilter {
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    #[must_use]
    pub const fn min_price(mut self, price: Decimal) -> Self {
        self.min_price = Some(price);
        self
    }

    #[must_use]
    pub const fn max_price(mut self, price: Decimal) -> Self {
        self.max_price = Some(price);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply the filter, preserving catalog order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let search = self
            .search
            .as_deref()
            .filter(|query| !query.is_empty());

        let filtered = products
            .iter()
            .filter(|p| self.category.as_ref().is_none_or(|c| &p.category == c))
            .filter(|p| search.is_none_or(|query| p.matches_search(query)))
            .filter(|p| self.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| self.max_price.is_none_or(|max| p.price <= max))
            .cloned();

        match self.limit {
            Some(limit) if limit > 0 => filtered.take(limit).collect(),
            _ => filtered.collect(),
        }
    }
}
