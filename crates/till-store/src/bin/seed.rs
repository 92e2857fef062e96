//! # Seed Data Generator
//!
//! Fills a data directory with demo products for development.
//!
//! ## Usage
//! ```bash
//! # 100 products in ./till-data, bootstrap admin from the environment
//! TILL_ADMIN_USER=admin TILL_ADMIN_PASSWORD=change-me \
//!     cargo run -p till-store --bin till-seed
//!
//! # Custom amount and directory
//! cargo run -p till-store --bin till-seed -- --count 500 --dir ./demo-data
//! ```
//!
//! ## Generated Products
//! - Barcode: `590{index:010}`
//! - Name: `{product} {size}`
//! - Price: 1.99 - 9.99 plus a size surcharge
//! - Stock: 0 - 100

use std::env;

use tracing_subscriber::EnvFilter;

use till_store::till_core::{Money, Product};
use till_store::{Store, StoreConfig};

/// Product names for realistic test data
const PRODUCTS: &[&str] = &[
    "Coca-Cola",
    "Orange Juice",
    "Mineral Water",
    "Potato Chips",
    "Chocolate Bar",
    "Whole Milk",
    "Cheddar Cheese",
    "Greek Yogurt",
    "White Bread",
    "Rice White",
    "Canned Beans",
    "Peanut Butter",
    "Laundry Soap",
    "Toothpaste",
    "Coffee Beans",
    "Green Tea",
    "Sugar",
    "Salt",
    "Eggs Dozen",
    "Butter",
];

/// Size variants with their surcharge in cents
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Medium", 100),
    ("Large", 200),
    ("12oz", 0),
    ("2L", 150),
    ("6-Pack", 300),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,till_store=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let mut config = StoreConfig::from_env();
    let mut count: usize = 100;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
                    i += 1;
                }
            }
            "--dir" | "-d" => {
                if i + 1 < args.len() {
                    config.data_dir = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: till-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 100)");
                println!("  -d, --dir <PATH>   Data directory (default: $TILL_DATA_DIR or ./till-data)");
                println!("  -h, --help         Show this help message");
                println!();
                println!("The admin from TILL_ADMIN_USER / TILL_ADMIN_PASSWORD is used to log in.");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let admin = config
        .bootstrap_admin
        .clone()
        .ok_or("set TILL_ADMIN_USER and TILL_ADMIN_PASSWORD")?;

    println!("Till Seed Data Generator");
    println!("========================");
    println!("Directory: {}", config.data_dir.display());
    println!("Products:  {}", count);
    println!();

    let store = Store::open(config).await?;
    let session = store.sessions().login(&admin.username, &admin.password).await?;
    println!("✓ Logged in as {}", admin.username);

    let existing = store.catalog().list_products(&session).await?;
    if !existing.is_empty() {
        println!("⚠ Catalog already has {} products", existing.len());
        println!("  Skipping seed to avoid overwriting stock levels.");
        store.sessions().logout(&session);
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (product_idx, name) in PRODUCTS.iter().enumerate() {
        for (size_idx, (size, surcharge)) in SIZES.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let product = generate_product(name, size, *surcharge, product_idx * 20 + size_idx);
            if let Err(e) = store.catalog().upsert_product(&session, product).await {
                eprintln!("Failed to insert product: {}", e);
                continue;
            }

            generated += 1;
            if generated % 50 == 0 {
                println!("  Generated {} products...", generated);
            }
        }
    }

    println!();
    println!("✓ Generated {} products in {:?}", generated, start.elapsed());

    let hits = store.catalog().search_products(&session, "milk", 10).await?;
    println!("  Search 'milk': {} results", hits.len());

    store.sessions().logout(&session);
    println!("✓ Seed complete!");
    Ok(())
}

/// Generates a single product from its position in the tables.
fn generate_product(name: &str, size: &str, surcharge: i64, seed: usize) -> Product {
    let barcode = format!("590{:010}", seed);
    let base_price = 199 + ((seed * 17) % 800) as i64;
    let stock = (seed % 101) as i64;

    Product::new(
        barcode,
        format!("{} {}", name, size),
        Money::from_cents(base_price + surcharge),
        stock,
    )
}
