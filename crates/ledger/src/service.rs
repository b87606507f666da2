//! Stock service providing the request-facing API over a ledger.

use std::future::Future;
use std::time::{Duration, Instant};

use common::{ProductId, UserId};

use crate::{
    LedgerError, Movement, MovementQuery, MovementRequest, MovementView, Result, StockLevel,
    StockLedger,
};

/// Default deadline for one ledger operation.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Service for applying and reading stock movements.
///
/// Validates raw input before touching storage and bounds every ledger call
/// with a deadline. A call that overruns is dropped, which rolls back any
/// open database transaction, and reported as [`LedgerError::Timeout`].
pub struct StockService<L: StockLedger> {
    ledger: L,
    deadline: Duration,
}

impl<L: StockLedger> StockService<L> {
    /// Creates a new stock service with the default deadline.
    pub fn new(ledger: L) -> Self {
        Self::with_deadline(ledger, DEFAULT_DEADLINE)
    }

    /// Creates a new stock service with a custom deadline.
    pub fn with_deadline(ledger: L, deadline: Duration) -> Self {
        Self { ledger, deadline }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Applies one stock movement from raw request input.
    #[tracing::instrument(skip(self))]
    pub async fn apply_movement(
        &self,
        product_id: ProductId,
        user_id: UserId,
        quantity: i64,
        move_type: &str,
    ) -> Result<Movement> {
        let result = match MovementRequest::new(product_id, user_id, quantity, move_type) {
            Ok(request) => {
                let start = Instant::now();
                let result = self.bounded(self.ledger.apply_movement(request)).await;
                metrics::histogram!("stock_movement_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                result
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(movement) => {
                metrics::counter!(
                    "stock_movements_total",
                    "move_type" => movement.move_type.as_str()
                )
                .increment(1);
                tracing::info!(
                    movement_id = %movement.id,
                    product_id = %movement.product_id,
                    quantity = movement.quantity,
                    move_type = %movement.move_type,
                    "stock movement applied"
                );
            }
            Err(e) => {
                metrics::counter!("stock_movements_rejected_total", "reason" => e.reason())
                    .increment(1);
                if e.reason() == "internal" || e.reason() == "timeout" {
                    tracing::error!(error = %e, "stock movement failed");
                } else {
                    tracing::debug!(error = %e, "stock movement rejected");
                }
            }
        }

        result
    }

    /// Lists movements, newest first, filtered by creation day.
    #[tracing::instrument(skip(self))]
    pub async fn movements(&self, query: MovementQuery) -> Result<Vec<MovementView>> {
        self.bounded(self.ledger.list_movements(query)).await
    }

    /// Returns the current stock level of a product, if it has a stock row.
    #[tracing::instrument(skip(self))]
    pub async fn stock_level(&self, product_id: ProductId) -> Result<Option<StockLevel>> {
        self.bounded(self.ledger.get_stock(product_id)).await
    }

    /// Opens the stock row for a product.
    #[tracing::instrument(skip(self))]
    pub async fn open_stock(&self, product_id: ProductId, quantity: i64) -> Result<StockLevel> {
        if product_id.is_unset() {
            return Err(LedgerError::InvalidProductId);
        }
        self.bounded(self.ledger.open_stock(product_id, quantity)).await
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.deadline, op)
            .await
            .map_err(|_| LedgerError::Timeout(self.deadline))?
    }
}
