use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MovementId, ProductId, UserId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    LedgerError, MoveType, Movement, MovementQuery, MovementRequest, MovementView, Result,
    StockLevel,
    store::{StockLedger, validate_opening_quantity},
};

/// Foreign key from `stocks.product_id` to `products.id`.
const STOCK_PRODUCT_FK: &str = "stocks_product_id_fkey";

/// PostgreSQL-backed stock ledger.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Lock, compute, update, record. Runs entirely inside `tx`.
    async fn apply_in_transaction(
        tx: &mut Transaction<'_, Postgres>,
        request: &MovementRequest,
    ) -> Result<Movement> {
        let product_id = request.product_id();

        // Row lock: a concurrent movement on this product waits here.
        let current: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM stocks WHERE product_id = $1 FOR UPDATE")
                .bind(product_id.as_i64())
                .fetch_optional(&mut **tx)
                .await?;
        let current = current.ok_or(LedgerError::StockNotFound(product_id))?;

        let next = request.resulting_quantity(current)?;

        sqlx::query("UPDATE stocks SET quantity = $1, updated_at = NOW() WHERE product_id = $2")
            .bind(next)
            .bind(product_id.as_i64())
            .execute(&mut **tx)
            .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO transactions (product_id, user_id, quantity, move_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(product_id.as_i64())
        .bind(request.user_id().as_i64())
        .bind(request.quantity())
        .bind(request.move_type().as_str())
        .fetch_one(&mut **tx)
        .await?;

        Ok(Movement {
            id: MovementId::new(row.try_get("id")?),
            product_id,
            user_id: request.user_id(),
            quantity: request.quantity(),
            move_type: request.move_type(),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_view(row: PgRow) -> Result<MovementView> {
        let move_type: String = row.try_get("move_type")?;
        let move_type: MoveType = move_type
            .parse()
            .map_err(|_| LedgerError::Storage(format!("unknown move_type '{move_type}'")))?;

        Ok(MovementView {
            id: MovementId::new(row.try_get("id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            sku: row.try_get("sku")?,
            user_id: UserId::new(row.try_get("user_id")?),
            user_name: row.try_get("user_name")?,
            quantity: row.try_get("quantity")?,
            move_type,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_level(row: PgRow) -> Result<StockLevel> {
        Ok(StockLevel {
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn apply_movement(&self, request: MovementRequest) -> Result<Movement> {
        let mut tx = self.pool.begin().await?;

        match Self::apply_in_transaction(&mut tx, &request).await {
            Ok(movement) => {
                tx.commit().await?;
                Ok(movement)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        "rollback failed; connection will be discarded"
                    );
                }
                Err(e)
            }
        }
    }

    async fn list_movements(&self, query: MovementQuery) -> Result<Vec<MovementView>> {
        let mut sql = String::from(
            r#"
            SELECT t.id, t.product_id, p.name AS product_name, p.sku,
                   t.user_id, u.name AS user_name,
                   t.quantity, t.move_type, t.created_at
            FROM transactions t
            LEFT JOIN products p ON p.id = t.product_id
            LEFT JOIN users u ON u.id = t.user_id
            WHERE 1=1
            "#,
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.start_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND t.created_at::date >= ${param_count}"));
        }
        if query.end_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND t.created_at::date <= ${param_count}"));
        }

        sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

        let mut sqlx_query = sqlx::query(&sql);
        if let Some(start) = query.start_date {
            sqlx_query = sqlx_query.bind(start);
        }
        if let Some(end) = query.end_date {
            sqlx_query = sqlx_query.bind(end);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_view).collect()
    }

    async fn get_stock(&self, product_id: ProductId) -> Result<Option<StockLevel>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT product_id, quantity, updated_at FROM stocks WHERE product_id = $1",
        )
        .bind(product_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_level).transpose()
    }

    async fn open_stock(&self, product_id: ProductId, quantity: i64) -> Result<StockLevel> {
        validate_opening_quantity(quantity)?;

        sqlx::query(
            r#"
            INSERT INTO stocks (product_id, quantity)
            VALUES ($1, $2)
            ON CONFLICT (product_id) DO NOTHING
            "#,
        )
        .bind(product_id.as_i64())
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(STOCK_PRODUCT_FK)
            {
                return LedgerError::ProductNotFound(product_id);
            }
            LedgerError::Database(e)
        })?;

        self.get_stock(product_id)
            .await?
            .ok_or(LedgerError::StockNotFound(product_id))
    }
}
