//! Mock catalog backed by the bundled product list.
//!
//! Every call sleeps for a configurable latency before answering so callers
//! exercise the same asynchronous paths a real backend would. Product details
//! are cached using `moka` (5-minute TTL).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use moka::future::Cache;
use rand::Rng;
use rand::seq::SliceRandom;
use shopfront_core::{LineItemId, Product, ProductId, ProductSummary};
use tracing::{debug, instrument, warn};

use super::{CatalogError, CatalogService, ProductFilter, RetryPolicy, SyncError};

const SEED_PRODUCTS: &str = include_str!("../../data/products.json");

const MAX_SUGGESTIONS: usize = 8;
const MIN_SUGGESTION_QUERY_CHARS: usize = 2;
const MAX_FEATURED_DEALS: usize = 6;
const FEATURED_DEAL_MIN_DISCOUNT: u8 = 20;
const MAX_RECOMMENDATIONS: usize = 10;

/// Parse the bundled product list.
pub fn seed_products() -> Result<Vec<Product>, serde_json::Error> {
    serde_json::from_str(SEED_PRODUCTS)
}

/// Artificial delay applied to each kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub products: Duration,
    pub product_detail: Duration,
    pub suggestions: Duration,
    pub listings: Duration,
    pub recommendations: Duration,
    pub sync_add: Duration,
    pub sync_update: Duration,
    pub sync_remove: Duration,
}

impl Latency {
    /// Delays matching the page's mock API.
    #[must_use]
    pub const fn simulated() -> Self {
        Self {
            products: Duration::from_millis(300),
            product_detail: Duration::from_millis(200),
            suggestions: Duration::from_millis(100),
            listings: Duration::from_millis(200),
            recommendations: Duration::from_millis(250),
            sync_add: Duration::from_millis(200),
            sync_update: Duration::from_millis(150),
            sync_remove: Duration::from_millis(150),
        }
    }

    /// No delay at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            products: Duration::ZERO,
            product_detail: Duration::ZERO,
            suggestions: Duration::ZERO,
            listings: Duration::ZERO,
            recommendations: Duration::ZERO,
            sync_add: Duration::ZERO,
            sync_update: Duration::ZERO,
            sync_remove: Duration::ZERO,
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::simulated()
    }
}

/// Fault injection for sync calls.
///
/// Each operation can be forced to fail; independently, every sync attempt
/// fails with probability `failure_rate`.
#[derive(Debug, Default)]
pub struct SyncFaults {
    add: AtomicBool,
    update: AtomicBool,
    remove: AtomicBool,
    failure_rate: f64,
}

impl SyncFaults {
    /// Faults with a random failure rate, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn with_failure_rate(failure_rate: f64) -> Self {
        Self {
            add: AtomicBool::new(false),
            update: AtomicBool::new(false),
            remove: AtomicBool::new(false),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub fn fail_add(&self, fail: bool) {
        self.add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.remove.store(fail, Ordering::SeqCst);
    }

    fn should_fail(&self, forced: &AtomicBool) -> bool {
        forced.load(Ordering::SeqCst)
            || (self.failure_rate > 0.0 && rand::rng().random_bool(self.failure_rate))
    }
}

/// Catalog and cart-sync service answering from bundled data.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct MockCatalog {
    inner: Arc<MockCatalogInner>,
}

struct MockCatalogInner {
    products: Vec<Product>,
    latency: Latency,
    retry: RetryPolicy,
    faults: SyncFaults,
    cache: Cache<ProductId, Product>,
}

impl MockCatalog {
    /// Create a catalog over the bundled product list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidSeed` if the bundled data fails to parse.
    pub fn seeded(latency: Latency, retry: RetryPolicy) -> Result<Self, CatalogError> {
        Ok(Self::with_products(seed_products()?, latency, retry))
    }

    /// Create a catalog over an explicit product list.
    #[must_use]
    pub fn with_products(products: Vec<Product>, latency: Latency, retry: RetryPolicy) -> Self {
        Self::with_faults(products, latency, retry, SyncFaults::default())
    }

    /// Create a catalog with fault injection configured up front.
    #[must_use]
    pub fn with_faults(
        products: Vec<Product>,
        latency: Latency,
        retry: RetryPolicy,
        faults: SyncFaults,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(MockCatalogInner {
                products,
                latency,
                retry,
                faults,
                cache,
            }),
        }
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.inner.products
    }

    /// Fault switches for sync calls.
    #[must_use]
    pub fn faults(&self) -> &SyncFaults {
        &self.inner.faults
    }

    /// List products matching `filter`.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self, filter: &ProductFilter) -> Vec<Product> {
        tokio::time::sleep(self.inner.latency.products).await;
        let products = filter.apply(&self.inner.products);
        debug!(count = products.len(), "Fetched products");
        products
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the id is unknown.
    #[instrument(skip_all, fields(product_id = %product_id))]
    pub async fn fetch_product_detail(&self, product_id: &ProductId) -> Result<Product, CatalogError> {
        if let Some(product) = self.inner.cache.get(product_id).await {
            debug!("Cache hit for product detail");
            return Ok(product);
        }

        tokio::time::sleep(self.inner.latency.product_detail).await;
        let product = self
            .inner
            .products
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(product_id.clone()))?;

        self.inner
            .cache
            .insert(product_id.clone(), product.clone())
            .await;
        Ok(product)
    }

    /// Titles of products whose title or category contains `query`.
    ///
    /// Queries shorter than two characters return nothing without a
    /// round trip.
    #[instrument(skip(self))]
    pub async fn search_suggestions(&self, query: &str) -> Vec<String> {
        if query.chars().count() < MIN_SUGGESTION_QUERY_CHARS {
            return Vec::new();
        }

        tokio::time::sleep(self.inner.latency.suggestions).await;
        let query = query.to_lowercase();
        self.inner
            .products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&query) || p.category.to_lowercase().contains(&query)
            })
            .map(|p| p.title.clone())
            .take(MAX_SUGGESTIONS)
            .collect()
    }

    /// Products discounted by more than 20%.
    #[instrument(skip(self))]
    pub async fn featured_deals(&self) -> Vec<Product> {
        tokio::time::sleep(self.inner.latency.listings).await;
        self.inner
            .products
            .iter()
            .filter(|p| p.discount > FEATURED_DEAL_MIN_DISCOUNT)
            .take(MAX_FEATURED_DEALS)
            .cloned()
            .collect()
    }

    /// Best sellers, most reviewed first.
    #[instrument(skip(self))]
    pub async fn best_sellers(&self) -> Vec<Product> {
        tokio::time::sleep(self.inner.latency.listings).await;
        let mut products: Vec<Product> = self
            .inner
            .products
            .iter()
            .filter(|p| p.best_seller)
            .cloned()
            .collect();
        products.sort_by(|a, b| b.review_count.cmp(&a.review_count));
        products
    }

    /// A random selection of products.
    #[instrument(skip(self))]
    pub async fn recommendations(&self) -> Vec<Product> {
        tokio::time::sleep(self.inner.latency.recommendations).await;
        let mut products = self.inner.products.clone();
        products.shuffle(&mut rand::rng());
        products.truncate(MAX_RECOMMENDATIONS);
        products
    }

    async fn acknowledge(
        &self,
        operation: &'static str,
        delay: Duration,
        forced: &AtomicBool,
    ) -> Result<(), SyncError> {
        self.inner
            .retry
            .run(operation, move || async move {
                tokio::time::sleep(delay).await;
                if self.inner.faults.should_fail(forced) {
                    warn!(operation, "Mock backend rejected sync");
                    Err(SyncError::Rejected(format!("{operation} rejected by backend")))
                } else {
                    Ok(())
                }
            })
            .await
    }
}

impl CatalogService for MockCatalog {
    async fn resolve_product(&self, product_id: &ProductId) -> Result<ProductSummary, CatalogError> {
        self.fetch_product_detail(product_id)
            .await
            .map(|product| product.summary())
    }

    #[instrument(skip_all, fields(product_id = %product_id, quantity))]
    async fn sync_add(&self, product_id: &ProductId, quantity: u32) -> Result<(), SyncError> {
        self.acknowledge("add", self.inner.latency.sync_add, &self.inner.faults.add)
            .await
    }

    #[instrument(skip_all, fields(item_id = %item_id, quantity))]
    async fn sync_update(&self, item_id: &LineItemId, quantity: u32) -> Result<(), SyncError> {
        self.acknowledge("update", self.inner.latency.sync_update, &self.inner.faults.update)
            .await
    }

    #[instrument(skip_all, fields(item_id = %item_id))]
    async fn sync_remove(&self, item_id: &LineItemId) -> Result<(), SyncError> {
        self.acknowledge("remove", self.inner.latency.sync_remove, &self.inner.faults.remove)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn catalog() -> MockCatalog {
        MockCatalog::seeded(Latency::none(), RetryPolicy::no_retry()).unwrap()
    }

    #[test]
    fn test_seed_parses() {
        let products = seed_products().unwrap();
        assert_eq!(products.len(), 8);
        assert_eq!(products[0].price, Decimal::new(12999, 2));
        assert_eq!(products[3].original_price, None);
    }

    #[tokio::test]
    async fn test_product_detail_found() {
        let product = catalog()
            .fetch_product_detail(&ProductId::new("B14E89012"))
            .await
            .unwrap();
        assert_eq!(product.title, "The Midnight Library");
    }

    #[tokio::test]
    async fn test_product_detail_not_found() {
        let result = catalog()
            .fetch_product_detail(&ProductId::new("missing"))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound(id)) if id.as_str() == "missing"));
    }

    #[tokio::test]
    async fn test_product_detail_is_cached() {
        let catalog = catalog();
        let id = ProductId::new("B08Y23456");
        let first = catalog.fetch_product_detail(&id).await.unwrap();
        let second = catalog.fetch_product_detail(&id).await.unwrap();
        assert_eq!(first, second);
        assert!(catalog.inner.cache.contains_key(&id));
    }

    #[tokio::test]
    async fn test_suggestions_require_two_chars() {
        let catalog = catalog();
        assert!(catalog.search_suggestions("").await.is_empty());
        assert!(catalog.search_suggestions("w").await.is_empty());
        assert!(!catalog.search_suggestions("wi").await.is_empty());
    }

    #[tokio::test]
    async fn test_suggestions_match_category() {
        let suggestions = catalog().search_suggestions("ELECTRONICS").await;
        assert_eq!(suggestions.len(), 5);
        assert_eq!(suggestions[0], "Premium Bluetooth Headphones");
    }

    #[tokio::test]
    async fn test_featured_deals_discount_over_twenty() {
        let deals = catalog().featured_deals().await;
        assert!(deals.iter().all(|p| p.discount > 20));
        assert!(!deals.iter().any(|p| p.id.as_str() == "B08Y23456"));
        assert!(deals.len() <= 6);
    }

    #[tokio::test]
    async fn test_best_sellers_sorted_by_reviews() {
        let best = catalog().best_sellers().await;
        assert_eq!(best.len(), 4);
        assert_eq!(best[0].id.as_str(), "B14E89012");
        assert!(best.windows(2).all(|w| w[0].review_count >= w[1].review_count));
    }

    #[tokio::test]
    async fn test_recommendations_are_a_permutation() {
        let mut ids: Vec<String> = catalog()
            .recommendations()
            .await
            .into_iter()
            .map(|p| p.id.into())
            .collect();
        ids.sort();
        assert_eq!(ids.len(), 8);
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[tokio::test]
    async fn test_resolve_product_returns_summary() {
        let summary = catalog()
            .resolve_product(&ProductId::new("B11B56789"))
            .await
            .unwrap();
        assert_eq!(summary.price, Decimal::new(3999, 2));
        assert_eq!(summary.attributes["brand"], "ChargePlus");
    }

    #[tokio::test]
    async fn test_sync_fault_switches() {
        let catalog = catalog();
        let item = LineItemId::new("item-1");
        assert!(catalog.sync_update(&item, 2).await.is_ok());

        catalog.faults().fail_update(true);
        assert!(matches!(
            catalog.sync_update(&item, 2).await,
            Err(SyncError::Rejected(_))
        ));
        assert!(catalog.sync_remove(&item).await.is_ok());

        catalog.faults().fail_update(false);
        assert!(catalog.sync_update(&item, 2).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_rate_one_always_fails() {
        let catalog = MockCatalog::with_faults(
            seed_products().unwrap(),
            Latency::none(),
            RetryPolicy::no_retry(),
            SyncFaults::with_failure_rate(1.0),
        );
        assert!(catalog.sync_add(&ProductId::new("B07X12345"), 1).await.is_err());
    }
}
