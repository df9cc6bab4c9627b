//! Integration tests for the mock catalog and the cart wired to it.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use shopfront_core::{LineItemId, ProductId};
use shopfront_storefront::cart::{CartManager, MemoryStore};
use shopfront_storefront::catalog::{
    CatalogService, Latency, MockCatalog, ProductFilter, RetryPolicy, SyncError, SyncFaults,
    seed_products,
};
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::state::AppState;
use tokio::time::Instant;

fn catalog() -> MockCatalog {
    MockCatalog::seeded(Latency::none(), RetryPolicy::no_retry()).unwrap()
}

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_combined_filters() {
    let products = catalog()
        .fetch_products(
            &ProductFilter::default()
                .category("electronics")
                .max_price(Decimal::new(150, 0))
                .limit(2),
        )
        .await;

    assert_eq!(products.len(), 2);
    assert!(products.iter().all(|p| p.category == "electronics"));
    assert_eq!(products[0].id.as_str(), "B07X12345");
    assert_eq!(products[1].id.as_str(), "B08Y23456");
}

#[tokio::test]
async fn test_search_without_matches() {
    let products = catalog()
        .fetch_products(&ProductFilter::default().search("submarine"))
        .await;
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_featured_deals_and_best_sellers() {
    let catalog = catalog();

    let deals = catalog.featured_deals().await;
    assert_eq!(deals.len(), 6);
    assert!(deals.iter().all(|p| p.discount > 20));

    let best: Vec<String> = catalog
        .best_sellers()
        .await
        .into_iter()
        .map(|p| p.id.into())
        .collect();
    assert_eq!(best, ["B14E89012", "B07X12345", "B13D78901", "B10A45678"]);
}

#[tokio::test]
async fn test_suggestions_are_titles() {
    let suggestions = catalog().search_suggestions("coffee").await;
    assert_eq!(suggestions, ["Coffee Maker Deluxe"]);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_latency() {
    let catalog = MockCatalog::seeded(Latency::simulated(), RetryPolicy::default()).unwrap();
    let start = Instant::now();
    catalog.fetch_products(&ProductFilter::default()).await;
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_millis(400));
}

// =============================================================================
// Sync policy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_rejected_sync_is_retried_with_delay() {
    let policy = RetryPolicy {
        timeout: Duration::from_secs(5),
        retries: 2,
        retry_delay: Duration::from_secs(1),
    };
    let catalog = MockCatalog::with_faults(
        seed_products().unwrap(),
        Latency::none(),
        policy,
        SyncFaults::default(),
    );
    catalog.faults().fail_remove(true);

    let start = Instant::now();
    let result = catalog.sync_remove(&LineItemId::new("item-1")).await;

    assert!(matches!(result, Err(SyncError::Rejected(_))));
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_slow_sync_times_out_without_retry() {
    let latency = Latency {
        sync_update: Duration::from_secs(10),
        ..Latency::none()
    };
    let policy = RetryPolicy {
        timeout: Duration::from_secs(5),
        retries: 3,
        retry_delay: Duration::from_secs(1),
    };
    let catalog = MockCatalog::with_products(seed_products().unwrap(), latency, policy);

    let start = Instant::now();
    let result = catalog.sync_update(&LineItemId::new("item-1"), 2).await;

    assert_eq!(result, Err(SyncError::Timeout(Duration::from_secs(5))));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(6));
}

// =============================================================================
// Cart against the mock catalog
// =============================================================================

#[tokio::test]
async fn test_cart_rolls_back_rejected_update() {
    let cart = CartManager::new(Arc::new(MemoryStore::new()), catalog()).unwrap();
    let items = cart
        .add_product(&ProductId::new("B12C67890"), 1)
        .await
        .unwrap();
    assert_eq!(items[0].product.attributes["category"], "fashion");
    cart.settle().await;

    cart.catalog().faults().fail_update(true);
    cart.update_quantity(&items[0].id, 3).unwrap();
    assert_eq!(cart.subtotal(), Decimal::new(26997, 2));

    cart.settle().await;
    assert_eq!(cart.item_count(), 1);
    assert_eq!(cart.subtotal(), Decimal::new(8999, 2));
}

#[tokio::test]
async fn test_cart_prices_are_captured_at_add_time() {
    let cart = CartManager::new(Arc::new(MemoryStore::new()), catalog()).unwrap();
    cart.add_product(&ProductId::new("B14E89012"), 2)
        .await
        .unwrap();
    cart.add_product(&ProductId::new("B11B56789"), 1)
        .await
        .unwrap();

    assert_eq!(cart.item_count(), 3);
    assert_eq!(cart.subtotal(), Decimal::new(6997, 2));
    cart.settle().await;
}

#[tokio::test]
async fn test_app_state_wires_configured_cart() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorefrontConfig {
        store_dir: Some(dir.path().to_path_buf()),
        cart_key: "guest".to_string(),
        simulate_latency: false,
        ..StorefrontConfig::default()
    };

    let state = AppState::init(config).unwrap();
    state
        .cart()
        .add_product(&ProductId::new("B07X12345"), 1)
        .await
        .unwrap();
    state.cart().settle().await;

    assert!(dir.path().join("guest.json").exists());
    assert!(!dir.path().join("cart.json").exists());
}
