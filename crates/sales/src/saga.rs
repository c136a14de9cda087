//! Compensation log for the create-sale saga.
//!
//! There is no shared transaction between the stock ledger and the sale
//! store, so consistency comes from explicit compensating actions: every
//! successful decrement is recorded here, and if a later step fails the
//! log restores the decremented quantities in reverse order before the
//! call returns.

use common::{ProductId, StoreId};
use stock_ledger::StockLedger;

/// A pending compensation: restore a quantity that was decremented
/// earlier in the same saga.
#[derive(Debug, Clone)]
struct PendingRestore {
    store_id: StoreId,
    product_id: ProductId,
    quantity: i64,
}

/// Ordered list of compensating restores for one sale attempt.
pub struct CompensationLog {
    reference: String,
    entries: Vec<PendingRestore>,
}

impl CompensationLog {
    /// Creates an empty log; `reference` is recorded with every restore
    /// movement so reconciliation can tie it back to the failed attempt.
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            entries: Vec::new(),
        }
    }

    /// Records a successfully applied decrement.
    pub fn record(&mut self, store_id: StoreId, product_id: ProductId, quantity: i64) {
        self.entries.push(PendingRestore {
            store_id,
            product_id,
            quantity,
        });
    }

    /// Returns true if no decrements have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs all compensations in reverse order.
    ///
    /// Each restore is retried once; a restore that fails twice is logged
    /// loudly and counted, and the method reports that stock may be
    /// inconsistent by returning `false`.
    pub async fn run(self, ledger: &dyn StockLedger) -> bool {
        let mut fully_compensated = true;

        for entry in self.entries.iter().rev() {
            let mut restored = false;
            for attempt in 1..=2 {
                match ledger
                    .restore(
                        entry.store_id,
                        &entry.product_id,
                        entry.quantity,
                        &self.reference,
                    )
                    .await
                {
                    Ok(_) => {
                        restored = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            store_id = %entry.store_id,
                            product_id = %entry.product_id,
                            quantity = entry.quantity,
                            attempt,
                            error = %e,
                            "saga compensation restore failed"
                        );
                    }
                }
            }

            if !restored {
                metrics::counter!("saga_compensation_failures").increment(1);
                tracing::error!(
                    store_id = %entry.store_id,
                    product_id = %entry.product_id,
                    quantity = entry.quantity,
                    reference = %self.reference,
                    "UNRECOVERED saga compensation: stock is under-restored and needs manual reconciliation"
                );
                fully_compensated = false;
            }
        }

        fully_compensated
    }
}
