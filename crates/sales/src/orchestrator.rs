//! The create-sale saga orchestrator.

use std::sync::Arc;

use cache::CacheCoherence;
use common::{SaleId, StoreId, UserId};
use chrono::Utc;
use stock_ledger::{StockError, StockLedger};

use crate::error::{Result, SalesError};
use crate::models::{CreateSale, Sale, SaleLine, SaleRecord};
use crate::saga::CompensationLog;
use crate::status::SaleStatus;
use crate::store::SaleStore;

/// Turns a validated cart into a persisted sale without overselling.
///
/// Stock and the sale record live in independently-owned stores, so the
/// orchestrator runs a saga: decrement stock item by item, then persist
/// the sale; any failure rolls the decrements back through the
/// [`CompensationLog`] before returning.
pub struct SaleOrchestrator {
    ledger: Arc<dyn StockLedger>,
    store: Arc<dyn SaleStore>,
    cache: CacheCoherence,
}

impl SaleOrchestrator {
    /// Creates a new sale orchestrator over the injected collaborators.
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        store: Arc<dyn SaleStore>,
        cache: CacheCoherence,
    ) -> Self {
        Self {
            ledger,
            store,
            cache,
        }
    }

    /// Creates a sale from a cart.
    ///
    /// On success the stock is durably decremented and the sale durably
    /// recorded. On failure stock is back at its pre-call value, except
    /// when compensation itself fails, which is surfaced as `Internal`.
    #[tracing::instrument(
        skip(self, cmd),
        fields(store_id = %cmd.store_id, user_id = %cmd.user_id, items = cmd.items.len())
    )]
    pub async fn create_sale(&self, cmd: CreateSale) -> Result<SaleRecord> {
        metrics::counter!("sale_attempts").increment(1);
        let started = std::time::Instant::now();

        Self::validate(&cmd)?;

        let sale_id = SaleId::new();
        let mut compensation = CompensationLog::new(format!("sale-{sale_id}-rollback"));

        // Step 1: decrement stock per item, recording each success so a
        // later failure can undo exactly what was applied.
        for item in &cmd.items {
            match self
                .ledger
                .decrement(cmd.store_id, &item.product_id, i64::from(item.quantity))
                .await
            {
                Ok(_) => {
                    compensation.record(
                        cmd.store_id,
                        item.product_id.clone(),
                        i64::from(item.quantity),
                    );
                }
                Err(e) => {
                    if matches!(e, StockError::InsufficientStock { .. }) {
                        metrics::counter!("sale_rejected_insufficient_stock").increment(1);
                    }
                    return Err(self.roll_back(&cmd, compensation, SalesError::Stock(e)).await);
                }
            }
        }

        // Step 2: persist sale + lines in one local transaction.
        let sale = Sale {
            id: sale_id,
            store_id: cmd.store_id,
            user_id: cmd.user_id,
            date: Utc::now(),
            total: cmd.total(),
            status: SaleStatus::Active,
        };
        let lines: Vec<SaleLine> = cmd
            .items
            .iter()
            .map(|item| SaleLine {
                sale_id,
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        if let Err(e) = self.store.create(&sale, &lines).await {
            tracing::error!(error = %e, %sale_id, "sale persistence failed after stock decrement");
            let internal = SalesError::Internal(format!("sale persistence failed: {e}"));
            return Err(self.roll_back(&cmd, compensation, internal).await);
        }

        // Step 3: invalidation runs after the primary writes and cannot
        // fail the sale.
        self.cache
            .after_sale(
                cmd.store_id,
                cmd.user_id,
                cmd.items.iter().map(|i| &i.product_id),
            )
            .await;

        metrics::counter!("sales_created").increment(1);
        metrics::histogram!("sale_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(%sale_id, total_cents = sale.total.cents(), "sale created");

        Ok(SaleRecord { sale, lines })
    }

    /// Loads a sale with its lines.
    pub async fn get_sale(&self, sale_id: SaleId) -> Result<Option<SaleRecord>> {
        self.store.get(sale_id).await
    }

    /// Sales for a store, newest first.
    pub async fn sales_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>> {
        self.store.list_for_store(store_id).await
    }

    /// Sales for a user, newest first.
    pub async fn sales_for_user(&self, user_id: UserId) -> Result<Vec<Sale>> {
        self.store.list_for_user(user_id).await
    }

    fn validate(cmd: &CreateSale) -> Result<()> {
        if cmd.items.is_empty() {
            return Err(SalesError::Validation("cart has no items".to_string()));
        }
        for item in &cmd.items {
            if item.quantity == 0 {
                return Err(SalesError::Validation(format!(
                    "quantity for {} must be positive",
                    item.product_id
                )));
            }
            if item.unit_price.is_negative() {
                return Err(SalesError::Validation(format!(
                    "unit price for {} must not be negative",
                    item.product_id
                )));
            }
        }
        Ok(())
    }

    /// Runs the compensation log and decides the surfaced error: the
    /// original failure if stock was fully restored, `Internal` if
    /// compensation itself failed and stock may be inconsistent.
    ///
    /// Stock cache keys for the cart are invalidated either way: a reader
    /// may have cached a quantity between the decrement and the restore.
    async fn roll_back(
        &self,
        cmd: &CreateSale,
        compensation: CompensationLog,
        original: SalesError,
    ) -> SalesError {
        let fully_compensated = compensation.run(self.ledger.as_ref()).await;

        for item in &cmd.items {
            self.cache
                .after_stock_mutation(cmd.store_id, &item.product_id)
                .await;
        }

        if fully_compensated {
            original
        } else {
            SalesError::Internal(format!(
                "sale failed and compensation could not fully restore stock: {original}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use cache::{CacheStore, InMemoryCache, keys};
    use common::{Money, ProductId};
    use std::time::Duration;
    use stock_ledger::InMemoryStockLedger;

    use super::*;
    use crate::memory::InMemorySaleStore;
    use crate::models::CartItem;

    struct Setup {
        orchestrator: SaleOrchestrator,
        ledger: InMemoryStockLedger,
        store: InMemorySaleStore,
        cache: InMemoryCache,
    }

    fn setup() -> Setup {
        let ledger = InMemoryStockLedger::new();
        let store = InMemorySaleStore::new();
        let cache = InMemoryCache::new();
        let orchestrator = SaleOrchestrator::new(
            Arc::new(ledger.clone()),
            Arc::new(store.clone()),
            CacheCoherence::new(Arc::new(cache.clone())),
        );
        Setup {
            orchestrator,
            ledger,
            store,
            cache,
        }
    }

    fn cart(store_id: StoreId, user_id: UserId, items: Vec<CartItem>) -> CreateSale {
        CreateSale {
            user_id,
            store_id,
            items,
        }
    }

    fn sku(s: &str) -> ProductId {
        ProductId::new(s)
    }

    #[tokio::test]
    async fn selling_decrements_stock_and_persists_active_sale() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-001"), 10).await.unwrap();

        let record = s
            .orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![CartItem::new("SKU-001", 4, Money::from_cents(1000))],
            ))
            .await
            .unwrap();

        assert_eq!(record.sale.status, SaleStatus::Active);
        assert_eq!(record.sale.total.cents(), 4000);
        assert_eq!(record.lines.len(), 1);
        assert_eq!(
            s.ledger.quantity(store_id, &sku("SKU-001")).await.unwrap(),
            Some(6)
        );
        assert_eq!(s.store.sale_count().await, 1);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_earlier_decrements() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-A"), 5).await.unwrap();
        s.ledger.set_quantity(store_id, &sku("SKU-B"), 1).await.unwrap();

        let err = s
            .orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![
                    CartItem::new("SKU-A", 3, Money::from_cents(500)),
                    CartItem::new("SKU-B", 2, Money::from_cents(800)),
                ],
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SalesError::Stock(StockError::InsufficientStock { .. })
        ));
        // SKU-A's decrement was compensated; SKU-B never moved.
        assert_eq!(
            s.ledger.quantity(store_id, &sku("SKU-A")).await.unwrap(),
            Some(5)
        );
        assert_eq!(
            s.ledger.quantity(store_id, &sku("SKU-B")).await.unwrap(),
            Some(1)
        );
        assert_eq!(s.store.sale_count().await, 0);
    }

    #[tokio::test]
    async fn persistence_failure_restores_stock_and_reports_internal() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-001"), 10).await.unwrap();
        s.store.set_fail_on_create(true).await;

        let err = s
            .orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![CartItem::new("SKU-001", 4, Money::from_cents(1000))],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, SalesError::Internal(_)));
        assert_eq!(
            s.ledger.quantity(store_id, &sku("SKU-001")).await.unwrap(),
            Some(10)
        );
        assert_eq!(s.store.sale_count().await, 0);
    }

    #[tokio::test]
    async fn failed_compensation_escalates_to_internal() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-A"), 5).await.unwrap();
        // SKU-B is short, and restores are also failing.
        s.ledger.set_quantity(store_id, &sku("SKU-B"), 0).await.unwrap();
        s.ledger.set_fail_on_restore(true).await;

        let err = s
            .orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![
                    CartItem::new("SKU-A", 1, Money::from_cents(500)),
                    CartItem::new("SKU-B", 1, Money::from_cents(800)),
                ],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, SalesError::Internal(_)));
    }

    #[tokio::test]
    async fn two_concurrent_sales_cannot_share_the_last_unit() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-001"), 1).await.unwrap();

        let make = || {
            cart(
                store_id,
                user_id,
                vec![CartItem::new("SKU-001", 1, Money::from_cents(1000))],
            )
        };
        let (a, b) = tokio::join!(
            s.orchestrator.create_sale(make()),
            s.orchestrator.create_sale(make()),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(
            s.ledger.quantity(store_id, &sku("SKU-001")).await.unwrap(),
            Some(0)
        );
        assert_eq!(s.store.sale_count().await, 1);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_write() {
        let s = setup();
        let err = s
            .orchestrator
            .create_sale(cart(StoreId::new(), UserId::new(), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::Validation(_)));
        assert!(s.ledger.movements().await.is_empty());
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected() {
        let s = setup();
        let err = s
            .orchestrator
            .create_sale(cart(
                StoreId::new(),
                UserId::new(),
                vec![CartItem::new("SKU-001", 0, Money::from_cents(1000))],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SalesError::Validation(_)));
    }

    #[tokio::test]
    async fn successful_sale_invalidates_cached_reads() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-001"), 10).await.unwrap();

        for key in [
            keys::stock_level(store_id, &sku("SKU-001")),
            keys::sales_by_store(store_id),
            keys::sales_by_user(user_id),
        ] {
            s.cache
                .set(&key, "stale".to_string(), Duration::from_secs(300))
                .await
                .unwrap();
        }

        s.orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![CartItem::new("SKU-001", 1, Money::from_cents(1000))],
            ))
            .await
            .unwrap();

        assert!(!s.cache.contains(&keys::stock_level(store_id, &sku("SKU-001"))).await);
        assert!(!s.cache.contains(&keys::sales_by_store(store_id)).await);
        assert!(!s.cache.contains(&keys::sales_by_user(user_id)).await);
    }

    #[tokio::test]
    async fn cache_outage_does_not_fail_the_sale() {
        let s = setup();
        let (store_id, user_id) = (StoreId::new(), UserId::new());
        s.ledger.set_quantity(store_id, &sku("SKU-001"), 10).await.unwrap();
        s.cache.set_fail(true).await;

        let record = s
            .orchestrator
            .create_sale(cart(
                store_id,
                user_id,
                vec![CartItem::new("SKU-001", 1, Money::from_cents(1000))],
            ))
            .await
            .unwrap();
        assert_eq!(record.sale.status, SaleStatus::Active);
    }
}
