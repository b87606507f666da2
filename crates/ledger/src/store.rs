use async_trait::async_trait;
use common::ProductId;

use crate::{Movement, MovementQuery, MovementRequest, MovementView, Result, StockLevel};

/// Core trait for stock ledger implementations.
///
/// A ledger owns the per-product stock rows and the append-only movement
/// history. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Applies a movement to one product's stock and records it.
    ///
    /// The stock row is locked for the duration of the call, so concurrent
    /// movements on the same product serialize and none is lost. Either the
    /// stock update and the movement record both persist, or neither does.
    async fn apply_movement(&self, request: MovementRequest) -> Result<Movement>;

    /// Lists recorded movements, newest first.
    async fn list_movements(&self, query: MovementQuery) -> Result<Vec<MovementView>>;

    /// Returns the current stock level of a product.
    ///
    /// Returns None if the product has no stock row.
    async fn get_stock(&self, product_id: ProductId) -> Result<Option<StockLevel>>;

    /// Creates the stock row for a product with an opening quantity.
    ///
    /// If the row already exists it is left untouched and returned as is.
    async fn open_stock(&self, product_id: ProductId, quantity: i64) -> Result<StockLevel>;
}

/// Extension trait providing convenience methods for stock ledgers.
#[async_trait]
pub trait StockLedgerExt: StockLedger {
    /// Returns the quantity on hand, or None if the product has no stock row.
    async fn quantity_of(&self, product_id: ProductId) -> Result<Option<i64>> {
        Ok(self.get_stock(product_id).await?.map(|s| s.quantity))
    }

    /// Lists every recorded movement, newest first.
    async fn all_movements(&self) -> Result<Vec<MovementView>> {
        self.list_movements(MovementQuery::new()).await
    }
}

// Blanket implementation for all StockLedger implementations
impl<T: StockLedger + ?Sized> StockLedgerExt for T {}

/// Validates an opening quantity for `open_stock`.
pub fn validate_opening_quantity(quantity: i64) -> Result<()> {
    if quantity < 0 {
        return Err(crate::LedgerError::InvalidOpeningQuantity(quantity));
    }
    Ok(())
}
