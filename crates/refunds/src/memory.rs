//! In-memory refund store for tests and cache-less development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{RefundId, SaleId, StoreId, UserId};
use tokio::sync::RwLock;

use crate::error::{RefundError, Result};
use crate::models::{Refund, RefundLine, RefundRecord};
use crate::store::RefundStore;

#[derive(Default)]
struct StoreState {
    refunds: HashMap<RefundId, RefundRecord>,
    fail_on_create: bool,
}

/// In-memory refund store implementation.
#[derive(Clone, Default)]
pub struct InMemoryRefundStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryRefundStore {
    /// Creates a new empty in-memory refund store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail the next create calls.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of persisted refunds.
    pub async fn refund_count(&self) -> usize {
        self.state.read().await.refunds.len()
    }
}

#[async_trait]
impl RefundStore for InMemoryRefundStore {
    async fn create(&self, refund: &Refund, lines: &[RefundLine]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(RefundError::Internal(
                "refund store unavailable".to_string(),
            ));
        }

        state.refunds.insert(
            refund.id,
            RefundRecord {
                refund: refund.clone(),
                lines: lines.to_vec(),
            },
        );
        Ok(())
    }

    async fn get(&self, refund_id: RefundId) -> Result<Option<RefundRecord>> {
        Ok(self.state.read().await.refunds.get(&refund_id).cloned())
    }

    async fn list_for_sale(&self, sale_id: SaleId) -> Result<Vec<RefundRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<RefundRecord> = state
            .refunds
            .values()
            .filter(|r| r.refund.sale_id == sale_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.refund.date.cmp(&b.refund.date));
        Ok(records)
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Refund>> {
        let state = self.state.read().await;
        let mut refunds: Vec<Refund> = state
            .refunds
            .values()
            .filter(|r| r.refund.store_id == store_id)
            .map(|r| r.refund.clone())
            .collect();
        refunds.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(refunds)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Refund>> {
        let state = self.state.read().await;
        let mut refunds: Vec<Refund> = state
            .refunds
            .values()
            .filter(|r| r.refund.user_id == user_id)
            .map(|r| r.refund.clone())
            .collect();
        refunds.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(refunds)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{Money, ProductId};

    use super::*;

    fn sample_refund(sale_id: SaleId) -> (Refund, Vec<RefundLine>) {
        let refund = Refund {
            id: RefundId::new(),
            sale_id,
            store_id: StoreId::new(),
            user_id: UserId::new(),
            date: Utc::now(),
            total: Money::from_cents(1000),
            reason: "damaged".to_string(),
        };
        let lines = vec![RefundLine {
            refund_id: refund.id,
            product_id: ProductId::new("SKU-001"),
            quantity: 1,
            unit_price: Money::from_cents(1000),
        }];
        (refund, lines)
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = InMemoryRefundStore::new();
        let (refund, lines) = sample_refund(SaleId::new());

        store.create(&refund, &lines).await.unwrap();

        let record = store.get(refund.id).await.unwrap().unwrap();
        assert_eq!(record.refund, refund);
        assert_eq!(record.lines, lines);
    }

    #[tokio::test]
    async fn list_for_sale_is_oldest_first() {
        let store = InMemoryRefundStore::new();
        let sale_id = SaleId::new();

        let (mut first, lines) = sample_refund(sale_id);
        first.date = Utc::now() - chrono::Duration::hours(2);
        store.create(&first, &lines).await.unwrap();

        let (second, lines) = sample_refund(sale_id);
        store.create(&second, &lines).await.unwrap();

        let records = store.list_for_sale(sale_id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].refund.id, first.id);
        assert_eq!(records[1].refund.id, second.id);
    }

    #[tokio::test]
    async fn fail_on_create_injection() {
        let store = InMemoryRefundStore::new();
        store.set_fail_on_create(true).await;

        let (refund, lines) = sample_refund(SaleId::new());
        assert!(store.create(&refund, &lines).await.is_err());
        assert_eq!(store.refund_count().await, 0);
    }
}
