use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MovementId, ProductId, UserId};
use tokio::sync::{Mutex, RwLock};

use crate::{
    LedgerError, Movement, MovementQuery, MovementRequest, MovementView, Result, StockLevel,
    store::{StockLedger, validate_opening_quantity},
};

#[derive(Debug, Clone, Copy)]
struct StockRow {
    quantity: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProductLabel {
    name: String,
    sku: String,
}

/// In-memory stock ledger for testing and local runs.
///
/// Each stock row sits behind its own async mutex, which plays the part of
/// the database row lock: movements on one product serialize while
/// movements on different products proceed independently.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    stocks: Arc<RwLock<HashMap<ProductId, Arc<Mutex<StockRow>>>>>,
    movements: Arc<RwLock<Vec<Movement>>>,
    next_id: Arc<AtomicI64>,
    products: Arc<RwLock<HashMap<ProductId, ProductLabel>>>,
    users: Arc<RwLock<HashMap<UserId, String>>>,
    fail_next_append: Arc<AtomicBool>,
    frozen_clock: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the product details shown in movement listings.
    pub async fn label_product(
        &self,
        product_id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
    ) {
        self.products.write().await.insert(
            product_id,
            ProductLabel {
                name: name.into(),
                sku: sku.into(),
            },
        );
    }

    /// Registers the user name shown in movement listings.
    pub async fn label_user(&self, user_id: UserId, name: impl Into<String>) {
        self.users.write().await.insert(user_id, name.into());
    }

    /// Makes the next movement record fail.
    ///
    /// The stock row must then stay as it was, exactly as after a database
    /// rollback.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Pins the clock used for timestamps. `None` returns to wall time.
    pub async fn freeze_clock(&self, at: Option<DateTime<Utc>>) {
        *self.frozen_clock.write().await = at;
    }

    /// Returns the total number of recorded movements.
    pub async fn movement_count(&self) -> usize {
        self.movements.read().await.len()
    }

    async fn now(&self) -> DateTime<Utc> {
        self.frozen_clock.read().await.unwrap_or_else(Utc::now)
    }

    /// Builds and records the movement. Runs with the history lock held.
    fn record(
        &self,
        history: &mut Vec<Movement>,
        request: &MovementRequest,
        at: DateTime<Utc>,
    ) -> Result<Movement> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Storage(
                "failed to record movement".to_string(),
            ));
        }

        let movement = Movement {
            id: MovementId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            product_id: request.product_id(),
            user_id: request.user_id(),
            quantity: request.quantity(),
            move_type: request.move_type(),
            created_at: at,
        };
        history.push(movement.clone());
        Ok(movement)
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn apply_movement(&self, request: MovementRequest) -> Result<Movement> {
        let product_id = request.product_id();
        let slot = self
            .stocks
            .read()
            .await
            .get(&product_id)
            .cloned()
            .ok_or(LedgerError::StockNotFound(product_id))?;

        let mut row = slot.lock().await;
        let now = self.now().await;
        let mut history = self.movements.write().await;

        // No await past this point: a dropped future leaves both the row and
        // the history as they were.
        let quantity = request.resulting_quantity(row.quantity)?;
        let movement = self.record(&mut history, &request, now)?;
        row.quantity = quantity;
        row.updated_at = now;
        Ok(movement)
    }

    async fn list_movements(&self, query: MovementQuery) -> Result<Vec<MovementView>> {
        let movements = self.movements.read().await;
        let products = self.products.read().await;
        let users = self.users.read().await;

        let mut views: Vec<_> = movements
            .iter()
            .filter(|m| query.matches(&m.created_at))
            .map(|m| {
                let product = products.get(&m.product_id);
                MovementView {
                    id: m.id,
                    product_id: m.product_id,
                    product_name: product.map(|p| p.name.clone()),
                    sku: product.map(|p| p.sku.clone()),
                    user_id: m.user_id,
                    user_name: users.get(&m.user_id).cloned(),
                    quantity: m.quantity,
                    move_type: m.move_type,
                    created_at: m.created_at,
                }
            })
            .collect();

        // Newest first; ids break ties between movements sharing a timestamp.
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(views)
    }

    async fn get_stock(&self, product_id: ProductId) -> Result<Option<StockLevel>> {
        let slot = self.stocks.read().await.get(&product_id).cloned();
        match slot {
            Some(slot) => {
                let row = slot.lock().await;
                Ok(Some(StockLevel {
                    product_id,
                    quantity: row.quantity,
                    updated_at: row.updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn open_stock(&self, product_id: ProductId, quantity: i64) -> Result<StockLevel> {
        validate_opening_quantity(quantity)?;
        let now = self.now().await;

        let slot = self
            .stocks
            .write()
            .await
            .entry(product_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(StockRow {
                    quantity,
                    updated_at: now,
                }))
            })
            .clone();

        let row = slot.lock().await;
        Ok(StockLevel {
            product_id,
            quantity: row.quantity,
            updated_at: row.updated_at,
        })
    }
}
