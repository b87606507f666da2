//! Fixture data for local runs and the `seed` binary.
//!
//! Creates an admin account, a small catalog, and an opening stock row for
//! every product. Each step is idempotent, so seeding twice is harmless.

use accounts::{AuthError, AuthService, CredentialStore, Registration};
use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId, UserId};
use ledger::{InMemoryStockLedger, LedgerError, StockLedger, StockService};
use sqlx::PgPool;
use thiserror::Error;

/// Demo catalog: name, brand, price.
pub const DEMO_PRODUCTS: &[(&str, &str, &str)] = &[
    ("Mineral Water 600ml", "Aqua", "3500"),
    ("Instant Noodles", "Indomie", "3100"),
    ("Sweet Soy Sauce 275ml", "Bango", "12500"),
    ("Palm Cooking Oil 2L", "Bimoli", "38000"),
    ("Jasmine Rice 5kg", "Topi Koki", "72000"),
];

/// Category the demo catalog is filed under.
pub const DEMO_CATEGORY: &str = "Groceries";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("account setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("stock setup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("catalog setup failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Generates a product SKU: `SKU-<yyyyMMddHHmmss>-<000..999>`.
pub fn generate_sku(at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 1000;
    format!("SKU-{}-{suffix:03}", at.format("%Y%m%d%H%M%S"))
}

/// Registers the admin account, or returns the existing one.
pub async fn ensure_admin<C: CredentialStore>(
    auth: &AuthService<C>,
    email: &str,
    password: &str,
) -> Result<UserId, SeedError> {
    let registration = Registration {
        email: email.to_string(),
        password: password.to_string(),
        name: "Administrator".to_string(),
        phone: String::new(),
        role: Some("admin".to_string()),
    };

    match auth.register(registration).await {
        Ok(user) => Ok(user.id),
        Err(AuthError::EmailTaken(_)) => auth
            .store()
            .find_by_email(email.trim())
            .await?
            .map(|u| u.id)
            .ok_or(SeedError::Auth(AuthError::InvalidCredentials)),
        Err(e) => Err(e.into()),
    }
}

/// Opens a stock row for each product. Existing rows are left alone.
pub async fn open_stocks<L: StockLedger>(
    stock: &StockService<L>,
    products: &[ProductId],
    opening: i64,
) -> Result<(), SeedError> {
    for &product_id in products {
        stock.open_stock(product_id, opening).await?;
    }
    Ok(())
}

/// Registers the demo catalog with an in-memory ledger, numbering products
/// from 1, and returns their ids.
pub async fn label_demo_catalog(ledger: &InMemoryStockLedger) -> Vec<ProductId> {
    let now = Utc::now();
    let mut ids = Vec::with_capacity(DEMO_PRODUCTS.len());
    for (i, (name, _, _)) in DEMO_PRODUCTS.iter().enumerate() {
        let id = ProductId::new(i as i64 + 1);
        ledger.label_product(id, *name, generate_sku(now)).await;
        ids.push(id);
    }
    ids
}

/// Inserts the demo catalog into PostgreSQL, unless products already
/// exist, and returns the ids of every product.
pub async fn insert_demo_catalog(pool: &PgPool) -> Result<Vec<ProductId>, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    if existing == 0 {
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(DEMO_CATEGORY)
            .execute(&mut *tx)
            .await?;
        let category_id = CategoryId::new(
            sqlx::query_scalar("SELECT id FROM categories WHERE LOWER(TRIM(name)) = LOWER($1)")
                .bind(DEMO_CATEGORY)
                .fetch_one(&mut *tx)
                .await?,
        );

        let now = Utc::now();
        for (name, brand, price) in DEMO_PRODUCTS {
            sqlx::query(
                r#"
                INSERT INTO products (name, category_id, sku, brand, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(*name)
            .bind(category_id.as_i64())
            .bind(generate_sku(now))
            .bind(*brand)
            .bind(*price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(count = DEMO_PRODUCTS.len(), "demo catalog inserted");
    }

    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().map(ProductId::new).collect())
}

#[cfg(test)]
mod tests {
    use accounts::{InMemoryCredentialStore, TokenIssuer};
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn sku_format() {
        let at = Utc.with_ymd_and_hms(2025, 12, 14, 20, 15, 30).unwrap();
        let sku = generate_sku(at);

        assert!(sku.starts_with("SKU-20251214201530-"), "{sku}");
        let suffix = sku.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 3);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let auth = AuthService::new(InMemoryCredentialStore::new(), TokenIssuer::new("secret"));

        let first = ensure_admin(&auth, "admin@stocklab.local", "admin123")
            .await
            .unwrap();
        let second = ensure_admin(&auth, "admin@stocklab.local", "other")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(auth.store().len().await, 1);
        assert!(auth.login("admin@stocklab.local", "admin123").await.is_ok());
    }

    #[tokio::test]
    async fn demo_catalog_gets_stock() {
        let ledger = InMemoryStockLedger::new();
        let products = label_demo_catalog(&ledger).await;
        let stock = StockService::new(ledger);

        open_stocks(&stock, &products, 25).await.unwrap();
        open_stocks(&stock, &products, 99).await.unwrap();

        assert_eq!(products.len(), DEMO_PRODUCTS.len());
        for id in products {
            assert_eq!(stock.stock_level(id).await.unwrap().unwrap().quantity, 25);
        }
    }
}
