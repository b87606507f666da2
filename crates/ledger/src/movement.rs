use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::{MovementId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Result};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    /// Goods received; adds to stock.
    #[serde(rename = "IN")]
    In,
    /// Goods issued; removes from stock.
    #[serde(rename = "OUT")]
    Out,
}

impl MoveType {
    /// Returns the stored tag for this move type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveType::In => "IN",
            MoveType::Out => "OUT",
        }
    }
}

impl std::fmt::Display for MoveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoveType {
    type Err = LedgerError;

    /// Parses a move type, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(MoveType::In),
            "OUT" => Ok(MoveType::Out),
            _ => Err(LedgerError::InvalidMoveType(s.to_string())),
        }
    }
}

/// A validated request to move stock for one product.
///
/// Construction performs every check that does not need storage, so a
/// `MovementRequest` that exists is always safe to hand to a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    product_id: ProductId,
    user_id: UserId,
    quantity: i64,
    move_type: MoveType,
}

impl MovementRequest {
    /// Validates raw movement input.
    ///
    /// Checks run in a fixed order: product id, then quantity, then move
    /// type. The first failing check decides the error.
    pub fn new(
        product_id: ProductId,
        user_id: UserId,
        quantity: i64,
        move_type: &str,
    ) -> Result<Self> {
        if product_id.is_unset() {
            return Err(LedgerError::InvalidProductId);
        }
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        let move_type = move_type.parse()?;

        Ok(Self {
            product_id,
            user_id,
            quantity,
            move_type,
        })
    }

    /// Shorthand for an `IN` movement with already-typed input.
    pub fn inbound(product_id: ProductId, user_id: UserId, quantity: i64) -> Result<Self> {
        Self::new(product_id, user_id, quantity, MoveType::In.as_str())
    }

    /// Shorthand for an `OUT` movement with already-typed input.
    pub fn outbound(product_id: ProductId, user_id: UserId, quantity: i64) -> Result<Self> {
        Self::new(product_id, user_id, quantity, MoveType::Out.as_str())
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn move_type(&self) -> MoveType {
        self.move_type
    }

    /// Computes the stock level after this movement is applied to `current`.
    ///
    /// Zero is a valid result; anything below it is rejected.
    pub fn resulting_quantity(&self, current: i64) -> Result<i64> {
        match self.move_type {
            MoveType::In => current
                .checked_add(self.quantity)
                .ok_or(LedgerError::QuantityOverflow(self.product_id)),
            MoveType::Out => {
                let remaining = current - self.quantity;
                if remaining < 0 {
                    return Err(LedgerError::InsufficientStock {
                        product_id: self.product_id,
                        available: current,
                        requested: self.quantity,
                    });
                }
                Ok(remaining)
            }
        }
    }
}

/// A recorded stock movement, as returned by a successful apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub quantity: i64,
    pub move_type: MoveType,
    pub created_at: DateTime<Utc>,
}

/// A movement joined with the product and user it references.
///
/// Name fields are `None` when the referenced row has no readable details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementView {
    pub id: MovementId,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub quantity: i64,
    pub move_type: MoveType,
    pub created_at: DateTime<Utc>,
}

/// Current stock level of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}
