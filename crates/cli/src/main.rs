//! Shopfront CLI - Catalog queries and cart management.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! sf-cli products --category electronics --max-price 150
//! sf-cli suggest head
//!
//! # Work with the cart (stored under SHOPFRONT_STORE_DIR, default .shopfront)
//! sf-cli cart add B07X12345 -q 2
//! sf-cli cart update item-... 3
//! sf-cli cart show
//! ```
//!
//! # Commands
//!
//! - `products`, `product`, `suggest`, `deals`, `best-sellers`, `recommendations` - Catalog queries
//! - `cart show|add|update|remove|clear` - Cart operations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use shopfront_storefront::catalog::ProductFilter;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::state::AppState;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Store directory used when neither `--store-dir` nor `SHOPFRONT_STORE_DIR` is set.
const DEFAULT_STORE_DIR: &str = ".shopfront";

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront catalog and cart tools")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Directory for the durable cart store
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only products in this category
        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive match on title, brand or description
        #[arg(long)]
        search: Option<String>,

        /// Minimum price (inclusive)
        #[arg(long)]
        min_price: Option<Decimal>,

        /// Maximum price (inclusive)
        #[arg(long)]
        max_price: Option<Decimal>,

        /// Maximum number of products
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one product
    Product {
        /// Product id (e.g. `B07X12345`)
        id: String,
    },
    /// Suggest product titles for a partial query
    Suggest { query: String },
    /// Products with a discount above 20%
    Deals,
    /// Products flagged as best sellers, most reviewed first
    BestSellers,
    /// A shuffled selection of products
    Recommendations,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    /// Show cart contents
    Show,
    /// Add a product to the cart
    Add {
        /// Product id
        product_id: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line item (0 or less removes it)
    Update {
        /// Line item id
        item_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line item
    Remove {
        /// Line item id
        item_id: String,
    },
    /// Remove every line item
    Clear,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,shopfront_storefront=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = Some(dir);
    }
    config
        .store_dir
        .get_or_insert_with(|| PathBuf::from(DEFAULT_STORE_DIR));

    let state = AppState::init(config)?;
    let json = cli.json;

    match cli.command {
        Commands::Products {
            category,
            search,
            min_price,
            max_price,
            limit,
        } => {
            let filter = ProductFilter {
                category,
                search,
                min_price,
                max_price,
                limit,
            };
            commands::catalog::products(&state, &filter, json).await?;
        }
        Commands::Product { id } => commands::catalog::product(&state, &id, json).await?,
        Commands::Suggest { query } => commands::catalog::suggest(&state, &query, json).await?,
        Commands::Deals => commands::catalog::deals(&state, json).await?,
        Commands::BestSellers => commands::catalog::best_sellers(&state, json).await?,
        Commands::Recommendations => commands::catalog::recommendations(&state, json).await?,
        Commands::Cart { action } => match action {
            CartCommand::Show => commands::cart::show(&state, json)?,
            CartCommand::Add {
                product_id,
                quantity,
            } => commands::cart::add(&state, &product_id, quantity, json).await?,
            CartCommand::Update { item_id, quantity } => {
                commands::cart::update(&state, &item_id, quantity, json).await?;
            }
            CartCommand::Remove { item_id } => {
                commands::cart::remove(&state, &item_id, json).await?;
            }
            CartCommand::Clear => commands::cart::clear(&state, json).await?,
        },
    }
    Ok(())
}
