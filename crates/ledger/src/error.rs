use std::time::Duration;

use common::ProductId;
use thiserror::Error;

/// Errors that can occur when applying or reading stock movements.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The movement named no product (id 0).
    #[error("Invalid product id: a movement must name a product")]
    InvalidProductId,

    /// The movement quantity was zero or negative.
    #[error("Invalid quantity {0}: must be greater than zero")]
    InvalidQuantity(i64),

    /// The move type was neither `IN` nor `OUT`.
    #[error("Invalid move type '{0}': expected IN or OUT")]
    InvalidMoveType(String),

    /// A stock row cannot be opened with a negative quantity.
    #[error("Invalid opening quantity {0}: must not be negative")]
    InvalidOpeningQuantity(i64),

    /// A listing filter date was not `YYYY-MM-DD`.
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Applying the movement would overflow the stock counter.
    #[error("Quantity overflow for product {0}")]
    QuantityOverflow(ProductId),

    /// No stock row exists for the product.
    #[error("Stock not found for product {0}")]
    StockNotFound(ProductId),

    /// No catalog product exists with this id.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// An OUT movement asked for more than is on hand.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// The operation did not finish within its deadline and was abandoned.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A database error occurred. Any open transaction was rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A non-SQL storage failure, such as a corrupt stored value.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns true for input rejected before any storage access.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidProductId
                | LedgerError::InvalidQuantity(_)
                | LedgerError::InvalidMoveType(_)
                | LedgerError::InvalidOpeningQuantity(_)
                | LedgerError::InvalidDate(_)
                | LedgerError::QuantityOverflow(_)
        )
    }

    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            e if e.is_validation() => "validation",
            LedgerError::StockNotFound(_) | LedgerError::ProductNotFound(_) => "not_found",
            LedgerError::InsufficientStock { .. } => "insufficient_stock",
            LedgerError::Timeout(_) => "timeout",
            _ => "internal",
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
