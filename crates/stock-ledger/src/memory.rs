//! In-memory stock ledger for tests and cache-less development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, StoreId};
use tokio::sync::RwLock;

use crate::error::{Result, StockError};
use crate::ledger::{Availability, BulkUpdateOutcome, StockLedger, StockOp, StockUpdate};

/// A recorded mutation, mirroring the `stock_movements` table.
#[derive(Debug, Clone)]
pub struct Movement {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub delta: i64,
    pub reference: Option<String>,
}

#[derive(Default)]
struct LedgerState {
    quantities: HashMap<(StoreId, ProductId), i64>,
    movements: Vec<Movement>,
    fail_on_restore: bool,
}

/// In-memory stock ledger implementation.
///
/// The write lock is held across check-and-subtract, so it provides the
/// same no-oversell contract as the PostgreSQL conditional update.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to fail restore calls, simulating a backend
    /// outage during compensation or refund restoration.
    pub async fn set_fail_on_restore(&self, fail: bool) {
        self.state.write().await.fail_on_restore = fail;
    }

    /// Returns all recorded movements, oldest first.
    pub async fn movements(&self) -> Vec<Movement> {
        self.state.read().await.movements.clone()
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn check_availability(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Availability> {
        StockError::require_positive(quantity)?;

        let state = self.state.read().await;
        let current = state
            .quantities
            .get(&(store_id, product_id.clone()))
            .copied()
            .unwrap_or(0);

        Ok(Availability::of(current, quantity))
    }

    async fn decrement(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<i64> {
        StockError::require_positive(quantity)?;

        let mut state = self.state.write().await;
        let key = (store_id, product_id.clone());

        let Some(current) = state.quantities.get_mut(&key) else {
            return Err(StockError::NotFound {
                store_id,
                product_id: product_id.clone(),
            });
        };

        if *current < quantity {
            return Err(StockError::InsufficientStock {
                store_id,
                product_id: product_id.clone(),
                requested: quantity,
                available: *current,
            });
        }

        *current -= quantity;
        let new_qty = *current;
        state.movements.push(Movement {
            store_id,
            product_id: product_id.clone(),
            delta: -quantity,
            reference: None,
        });

        Ok(new_qty)
    }

    async fn restore(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
        reference: &str,
    ) -> Result<i64> {
        StockError::require_positive(quantity)?;

        let mut state = self.state.write().await;
        if state.fail_on_restore {
            return Err(StockError::Backend("restore unavailable".to_string()));
        }

        let entry = state
            .quantities
            .entry((store_id, product_id.clone()))
            .or_insert(0);
        *entry += quantity;
        let new_qty = *entry;

        state.movements.push(Movement {
            store_id,
            product_id: product_id.clone(),
            delta: quantity,
            reference: Some(reference.to_string()),
        });

        Ok(new_qty)
    }

    async fn transfer(
        &self,
        from_store_id: StoreId,
        to_store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()> {
        StockError::require_positive(quantity)?;

        let mut state = self.state.write().await;
        let from_key = (from_store_id, product_id.clone());

        let Some(&current) = state.quantities.get(&from_key) else {
            return Err(StockError::NotFound {
                store_id: from_store_id,
                product_id: product_id.clone(),
            });
        };

        if current < quantity {
            return Err(StockError::InsufficientStock {
                store_id: from_store_id,
                product_id: product_id.clone(),
                requested: quantity,
                available: current,
            });
        }

        // Both sides mutate under the same write guard: all-or-nothing.
        *state.quantities.entry(from_key).or_insert(0) -= quantity;
        *state
            .quantities
            .entry((to_store_id, product_id.clone()))
            .or_insert(0) += quantity;

        state.movements.push(Movement {
            store_id: from_store_id,
            product_id: product_id.clone(),
            delta: -quantity,
            reference: None,
        });
        state.movements.push(Movement {
            store_id: to_store_id,
            product_id: product_id.clone(),
            delta: quantity,
            reference: None,
        });

        Ok(())
    }

    async fn bulk_update(&self, updates: Vec<StockUpdate>) -> Vec<BulkUpdateOutcome> {
        let mut outcomes = Vec::with_capacity(updates.len());

        for update in updates {
            let result = match update.op {
                StockOp::Decrement => {
                    self.decrement(update.store_id, &update.product_id, update.quantity)
                        .await
                }
                StockOp::Restore => {
                    let reference = update.reference.as_deref().unwrap_or("bulk-update");
                    self.restore(
                        update.store_id,
                        &update.product_id,
                        update.quantity,
                        reference,
                    )
                    .await
                }
            };

            outcomes.push(BulkUpdateOutcome {
                store_id: update.store_id,
                product_id: update.product_id,
                result,
            });
        }

        outcomes
    }

    async fn quantity(&self, store_id: StoreId, product_id: &ProductId) -> Result<Option<i64>> {
        let state = self.state.read().await;
        Ok(state
            .quantities
            .get(&(store_id, product_id.clone()))
            .copied())
    }

    async fn set_quantity(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()> {
        StockError::require_non_negative(quantity)?;

        let mut state = self.state.write().await;
        state
            .quantities
            .insert((store_id, product_id.clone()), quantity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(s: &str) -> ProductId {
        ProductId::new(s)
    }

    #[tokio::test]
    async fn decrement_succeeds_with_enough_stock() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();
        ledger.set_quantity(store, &sku("SKU-001"), 10).await.unwrap();

        let new_qty = ledger.decrement(store, &sku("SKU-001"), 4).await.unwrap();
        assert_eq!(new_qty, 6);
        assert_eq!(ledger.quantity(store, &sku("SKU-001")).await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn decrement_fails_when_short() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();
        ledger.set_quantity(store, &sku("SKU-001"), 3).await.unwrap();

        let err = ledger.decrement(store, &sku("SKU-001"), 4).await.unwrap_err();
        assert!(matches!(
            err,
            StockError::InsufficientStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        // Nothing was mutated.
        assert_eq!(ledger.quantity(store, &sku("SKU-001")).await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn decrement_fails_on_missing_record() {
        let ledger = InMemoryStockLedger::new();
        let err = ledger
            .decrement(StoreId::new(), &sku("SKU-404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::NotFound { .. }));
    }

    #[tokio::test]
    async fn decrement_rejects_non_positive_quantity() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();
        ledger.set_quantity(store, &sku("SKU-001"), 5).await.unwrap();

        let err = ledger.decrement(store, &sku("SKU-001"), 0).await.unwrap_err();
        assert!(matches!(err, StockError::InvalidQuantity { .. }));
    }

    #[tokio::test]
    async fn restore_creates_record_and_logs_reference() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();

        let new_qty = ledger
            .restore(store, &sku("SKU-001"), 5, "refund-1")
            .await
            .unwrap();
        assert_eq!(new_qty, 5);

        let movements = ledger.movements().await;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].delta, 5);
        assert_eq!(movements[0].reference.as_deref(), Some("refund-1"));
    }

    #[tokio::test]
    async fn concurrent_decrements_cannot_oversell() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();
        ledger.set_quantity(store, &sku("SKU-001"), 1).await.unwrap();

        let sku_001 = sku("SKU-001");
        let (a, b) = tokio::join!(
            ledger.decrement(store, &sku_001, 1),
            ledger.decrement(store, &sku_001, 1),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(ledger.quantity(store, &sku("SKU-001")).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn transfer_moves_quantity_between_stores() {
        let ledger = InMemoryStockLedger::new();
        let (from, to) = (StoreId::new(), StoreId::new());
        ledger.set_quantity(from, &sku("SKU-001"), 10).await.unwrap();

        ledger.transfer(from, to, &sku("SKU-001"), 4).await.unwrap();

        assert_eq!(ledger.quantity(from, &sku("SKU-001")).await.unwrap(), Some(6));
        assert_eq!(ledger.quantity(to, &sku("SKU-001")).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn failed_transfer_leaves_both_sides_untouched() {
        let ledger = InMemoryStockLedger::new();
        let (from, to) = (StoreId::new(), StoreId::new());
        ledger.set_quantity(from, &sku("SKU-001"), 2).await.unwrap();

        let err = ledger.transfer(from, to, &sku("SKU-001"), 5).await.unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));

        assert_eq!(ledger.quantity(from, &sku("SKU-001")).await.unwrap(), Some(2));
        assert_eq!(ledger.quantity(to, &sku("SKU-001")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn bulk_update_continues_past_failures() {
        let ledger = InMemoryStockLedger::new();
        let store = StoreId::new();
        ledger.set_quantity(store, &sku("SKU-001"), 5).await.unwrap();

        let outcomes = ledger
            .bulk_update(vec![
                StockUpdate {
                    op: StockOp::Decrement,
                    store_id: store,
                    product_id: sku("SKU-001"),
                    quantity: 2,
                    reference: None,
                },
                StockUpdate {
                    op: StockOp::Decrement,
                    store_id: store,
                    product_id: sku("SKU-404"),
                    quantity: 1,
                    reference: None,
                },
                StockUpdate {
                    op: StockOp::Restore,
                    store_id: store,
                    product_id: sku("SKU-001"),
                    quantity: 1,
                    reference: Some("manual".to_string()),
                },
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(*outcomes[0].result.as_ref().unwrap(), 3);
        assert!(outcomes[1].result.is_err());
        assert_eq!(*outcomes[2].result.as_ref().unwrap(), 4);
    }

    #[tokio::test]
    async fn set_quantity_rejects_negative() {
        let ledger = InMemoryStockLedger::new();
        let err = ledger
            .set_quantity(StoreId::new(), &sku("SKU-001"), -1)
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::InvalidQuantity { .. }));
    }

    #[tokio::test]
    async fn restore_failure_injection() {
        let ledger = InMemoryStockLedger::new();
        ledger.set_fail_on_restore(true).await;

        let err = ledger
            .restore(StoreId::new(), &sku("SKU-001"), 1, "refund-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::Backend(_)));
    }
}
