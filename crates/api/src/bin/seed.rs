//! # Seed Data Generator
//!
//! Populates a PostgreSQL database with an admin account and a demo
//! catalog with opening stock, for development.
//!
//! ## Usage
//! ```bash
//! DATABASE_URL=postgres://localhost/stocklab cargo run -p api --bin seed
//!
//! # Custom opening quantity per product
//! cargo run -p api --bin seed -- --stock 250
//! ```

use std::env;

use accounts::{AuthService, PostgresCredentialStore, TokenIssuer};
use api::config::Config;
use api::seed;
use ledger::{PostgresStockLedger, StockService};
use sqlx::postgres::PgPoolOptions;

const DEFAULT_OPENING_STOCK: i64 = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    let args: Vec<String> = env::args().collect();
    let mut opening = DEFAULT_OPENING_STOCK;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    opening = args[i + 1].parse().unwrap_or(DEFAULT_OPENING_STOCK);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("StockLab Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --stock <N>    Opening stock per product (default: 100)");
                println!("  -h, --help         Show this help message");
                println!();
                println!("Reads DATABASE_URL, ADMIN_EMAIL and ADMIN_PASSWORD from the environment.");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(url) = config.database_url.as_deref() else {
        eprintln!("DATABASE_URL must be set");
        std::process::exit(1);
    };

    let pool = PgPoolOptions::new().max_connections(2).connect(url).await?;
    println!("✓ Connected to database");

    let ledger = PostgresStockLedger::new(pool.clone());
    ledger.run_migrations().await?;
    println!("✓ Migrations applied");

    let auth = AuthService::new(
        PostgresCredentialStore::new(pool.clone()),
        TokenIssuer::new(&config.jwt_secret),
    );
    let admin = seed::ensure_admin(&auth, &config.admin_email, &config.admin_password).await?;
    println!("✓ Admin account {} (id {admin})", config.admin_email);

    let products = seed::insert_demo_catalog(&pool).await?;
    println!("✓ Catalog has {} products", products.len());

    let stock = StockService::new(ledger);
    seed::open_stocks(&stock, &products, opening).await?;
    println!("✓ Stock rows opened at {opening}");

    pool.close().await;
    Ok(())
}
