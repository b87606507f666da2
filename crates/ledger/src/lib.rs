//! Stock ledger for the StockLab service.
//!
//! Holds one stock row per product plus an append-only history of stock
//! movements, and implements the movement protocol that keeps the two
//! consistent: lock the row, compute the new quantity, update the row,
//! record the movement, commit. No movement can drive a quantity below
//! zero, and concurrent movements on one product never lose updates.

pub mod error;
pub mod memory;
pub mod movement;
pub mod postgres;
pub mod query;
pub mod service;
pub mod store;

pub use common::{MovementId, ProductId, UserId};
pub use error::{LedgerError, Result};
pub use memory::InMemoryStockLedger;
pub use movement::{MoveType, Movement, MovementRequest, MovementView, StockLevel};
pub use postgres::PostgresStockLedger;
pub use query::MovementQuery;
pub use service::StockService;
pub use store::{StockLedger, StockLedgerExt};
