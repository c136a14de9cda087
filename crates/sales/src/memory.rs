//! In-memory sale store for tests and cache-less development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{SaleId, StoreId, UserId};
use tokio::sync::RwLock;

use crate::error::{Result, SalesError};
use crate::models::{Sale, SaleLine, SaleRecord};
use crate::status::SaleStatus;
use crate::store::SaleStore;

#[derive(Default)]
struct StoreState {
    sales: HashMap<SaleId, SaleRecord>,
    fail_on_create: bool,
}

/// In-memory sale store implementation.
#[derive(Clone, Default)]
pub struct InMemorySaleStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemorySaleStore {
    /// Creates a new empty in-memory sale store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail the next create calls, simulating a
    /// persistence outage after stock was already decremented.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Returns the number of persisted sales.
    pub async fn sale_count(&self) -> usize {
        self.state.read().await.sales.len()
    }
}

#[async_trait]
impl SaleStore for InMemorySaleStore {
    async fn create(&self, sale: &Sale, lines: &[SaleLine]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_create {
            return Err(SalesError::Internal("sale store unavailable".to_string()));
        }

        state.sales.insert(
            sale.id,
            SaleRecord {
                sale: sale.clone(),
                lines: lines.to_vec(),
            },
        );
        Ok(())
    }

    async fn get(&self, sale_id: SaleId) -> Result<Option<SaleRecord>> {
        Ok(self.state.read().await.sales.get(&sale_id).cloned())
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>> {
        let state = self.state.read().await;
        let mut sales: Vec<Sale> = state
            .sales
            .values()
            .filter(|r| r.sale.store_id == store_id)
            .map(|r| r.sale.clone())
            .collect();
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Sale>> {
        let state = self.state.read().await;
        let mut sales: Vec<Sale> = state
            .sales
            .values()
            .filter(|r| r.sale.user_id == user_id)
            .map(|r| r.sale.clone())
            .collect();
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(sales)
    }

    async fn update_status(&self, sale_id: SaleId, status: SaleStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .sales
            .get_mut(&sale_id)
            .ok_or(SalesError::NotFound(sale_id))?;
        record.sale.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{Money, ProductId};

    use super::*;

    fn sample_sale() -> (Sale, Vec<SaleLine>) {
        let sale = Sale {
            id: SaleId::new(),
            store_id: StoreId::new(),
            user_id: UserId::new(),
            date: Utc::now(),
            total: Money::from_cents(2000),
            status: SaleStatus::Active,
        };
        let lines = vec![SaleLine {
            sale_id: sale.id,
            product_id: ProductId::new("SKU-001"),
            quantity: 2,
            unit_price: Money::from_cents(1000),
        }];
        (sale, lines)
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let store = InMemorySaleStore::new();
        let (sale, lines) = sample_sale();

        store.create(&sale, &lines).await.unwrap();

        let record = store.get(sale.id).await.unwrap().unwrap();
        assert_eq!(record.sale, sale);
        assert_eq!(record.lines, lines);
    }

    #[tokio::test]
    async fn list_filters_by_store_and_user() {
        let store = InMemorySaleStore::new();
        let (sale, lines) = sample_sale();
        store.create(&sale, &lines).await.unwrap();

        assert_eq!(store.list_for_store(sale.store_id).await.unwrap().len(), 1);
        assert_eq!(store.list_for_user(sale.user_id).await.unwrap().len(), 1);
        assert!(store.list_for_store(StoreId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_status_of_missing_sale_fails() {
        let store = InMemorySaleStore::new();
        let err = store
            .update_status(SaleId::new(), SaleStatus::Refunded)
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_on_create_injection() {
        let store = InMemorySaleStore::new();
        store.set_fail_on_create(true).await;

        let (sale, lines) = sample_sale();
        assert!(store.create(&sale, &lines).await.is_err());
        assert_eq!(store.sale_count().await, 0);
    }
}
