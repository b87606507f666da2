//! Identifier types shared across the StockLab crates.

mod types;

pub use types::{CategoryId, MovementId, ProductId, UserId};
