//! Cart management commands.
//!
//! Every mutating command subscribes a renderer that prints the badge and
//! toast the page would show, waits for the remote sync to settle (including
//! any rollback), and then prints the resulting cart.

use shopfront_core::{LineItemId, ProductId};
use shopfront_storefront::cart::{CartBadge, CartEvent, CartToast, CartView, Subscription};
use shopfront_storefront::state::AppState;

/// Print the current cart.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub fn show(state: &AppState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    print_cart(state, json)
}

/// Add a catalog product to the cart.
///
/// # Errors
///
/// Returns an error if the product is unknown or the quantity is zero.
pub async fn add(
    state: &AppState,
    product_id: &str,
    quantity: u32,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = subscribe_renderer(state, json);
    state
        .cart()
        .add_product(&ProductId::new(product_id), quantity)
        .await?;
    finish(state, renderer, json).await
}

/// Set the quantity of a line item.
///
/// # Errors
///
/// Returns an error if the item is not in the cart.
pub async fn update(
    state: &AppState,
    item_id: &str,
    quantity: i64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = subscribe_renderer(state, json);
    state
        .cart()
        .update_quantity(&LineItemId::new(item_id), quantity)?;
    finish(state, renderer, json).await
}

/// Remove a line item.
///
/// # Errors
///
/// Returns an error if the item is not in the cart.
pub async fn remove(
    state: &AppState,
    item_id: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = subscribe_renderer(state, json);
    state.cart().remove_item(&LineItemId::new(item_id))?;
    finish(state, renderer, json).await
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub async fn clear(state: &AppState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = subscribe_renderer(state, json);
    state.cart().clear_cart();
    finish(state, renderer, json).await
}

async fn finish(
    state: &AppState,
    renderer: Subscription,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    state.cart().settle().await;
    renderer.unsubscribe();
    if json {
        Ok(())
    } else {
        print_cart(state, json)
    }
}

fn subscribe_renderer(state: &AppState, json: bool) -> Subscription {
    state.cart().subscribe(move |event: &CartEvent| {
        render_event(event, json);
        Ok(())
    })
}

#[allow(clippy::print_stdout)]
fn render_event(event: &CartEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "Failed to encode cart event"),
        }
        return;
    }

    if let Some(toast) = CartToast::from_event(event) {
        println!("{toast}");
    }
    let badge = CartBadge::from(event);
    if badge.visible {
        println!("[cart: {}] after {}", badge.count, event.action);
    } else {
        println!("[cart empty] after {}", event.action);
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(state: &AppState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cart = state.cart();
    if json {
        println!("{}", serde_json::to_string_pretty(&cart.snapshot())?);
    } else {
        print!("{}", CartView::from_items(&cart.items()));
    }
    Ok(())
}
