//! Catalog query commands.

use shopfront_core::{Product, ProductId};
use shopfront_storefront::catalog::ProductFilter;
use shopfront_storefront::state::AppState;

/// List products matching `filter`.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub async fn products(
    state: &AppState,
    filter: &ProductFilter,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let products = state.catalog().fetch_products(filter).await;
    print_products(&products, json)
}

/// Show a single product with its specifications.
///
/// # Errors
///
/// Returns an error if the product does not exist.
#[allow(clippy::print_stdout)]
pub async fn product(
    state: &AppState,
    id: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let product = state
        .catalog()
        .fetch_product_detail(&ProductId::new(id))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&product)?);
    } else {
        println!("{}", summary_line(&product));
        println!("  {}", product.description);
        if let Some(original) = product.original_price {
            println!("  Was ${original:.2} ({}% off)", product.discount);
        }
        for (name, value) in &product.specifications {
            println!("  {name}: {value}");
        }
    }
    Ok(())
}

/// Print title and category suggestions for a partial query.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
#[allow(clippy::print_stdout)]
pub async fn suggest(
    state: &AppState,
    query: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let suggestions = state.catalog().search_suggestions(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else {
        for suggestion in suggestions {
            println!("{suggestion}");
        }
    }
    Ok(())
}

/// List featured deals.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub async fn deals(state: &AppState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    print_products(&state.catalog().featured_deals().await, json)
}

/// List best sellers.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub async fn best_sellers(state: &AppState, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    print_products(&state.catalog().best_sellers().await, json)
}

/// List a shuffled selection of products.
///
/// # Errors
///
/// Returns an error if JSON output cannot be encoded.
pub async fn recommendations(
    state: &AppState,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    print_products(&state.catalog().recommendations().await, json)
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(products)?);
        return Ok(());
    }
    if products.is_empty() {
        println!("No products found");
    }
    for product in products {
        println!("{}", summary_line(product));
    }
    Ok(())
}

fn summary_line(product: &Product) -> String {
    let mut flags = Vec::new();
    if product.best_seller {
        flags.push("BESTSELLER");
    }
    if product.prime {
        flags.push("PRIME");
    }
    if product.new_arrival {
        flags.push("NEW");
    }
    if product.discount > 20 {
        flags.push("DEAL");
    }

    format!(
        "{:<10} {:<45} ${:>8.2}  {:.1} ({} reviews) {}",
        product.id,
        product.title,
        product.price,
        product.rating,
        product.review_count,
        flags.join(" ")
    )
}
