//! Shared application state, wired once at startup.

use std::sync::Arc;

use cache::{CacheCoherence, CacheStore, InMemoryCache};
use refunds::{InMemoryRefundStore, PostgresRefundStore, RefundOrchestrator, RefundPolicy};
use sales::{InMemorySaleStore, PostgresSaleStore, SaleOrchestrator};
use sqlx::PgPool;
use stock_ledger::{InMemoryStockLedger, PostgresStockLedger, StockLedger};

/// Everything the handlers need, constructed once and injected.
///
/// There is no ambient/global storage handle anywhere: the pool, the
/// ledger, the stores and the cache are built in `main` (or a test) and
/// passed down explicitly.
#[derive(Clone)]
pub struct AppState {
    pub stock: Arc<dyn StockLedger>,
    pub sales: Arc<SaleOrchestrator>,
    pub refunds: Arc<RefundOrchestrator>,
    pub cache: Arc<dyn CacheStore>,
    pub coherence: CacheCoherence,
}

impl AppState {
    /// Wires the state from explicit backends.
    pub fn new(
        stock: Arc<dyn StockLedger>,
        sale_store: Arc<dyn sales::SaleStore>,
        refund_store: Arc<dyn refunds::RefundStore>,
        cache_store: Arc<dyn CacheStore>,
        policy: RefundPolicy,
    ) -> Self {
        let coherence = CacheCoherence::new(cache_store.clone());
        let sale_orchestrator = Arc::new(SaleOrchestrator::new(
            stock.clone(),
            sale_store.clone(),
            coherence.clone(),
        ));
        let refund_orchestrator = Arc::new(RefundOrchestrator::new(
            stock.clone(),
            sale_store,
            refund_store,
            coherence.clone(),
            policy,
        ));

        Self {
            stock,
            sales: sale_orchestrator,
            refunds: refund_orchestrator,
            cache: cache_store,
            coherence,
        }
    }

    /// PostgreSQL-backed state sharing one pool across the stores.
    pub fn postgres(pool: PgPool, cache_store: Arc<dyn CacheStore>, policy: RefundPolicy) -> Self {
        Self::new(
            Arc::new(PostgresStockLedger::new(pool.clone())),
            Arc::new(PostgresSaleStore::new(pool.clone())),
            Arc::new(PostgresRefundStore::new(pool)),
            cache_store,
            policy,
        )
    }

    /// In-memory storage backends with the given cache, for tests,
    /// local development and database-less deployments.
    pub fn in_memory_with_cache(cache_store: Arc<dyn CacheStore>, policy: RefundPolicy) -> Self {
        Self::new(
            Arc::new(InMemoryStockLedger::new()),
            Arc::new(InMemorySaleStore::new()),
            Arc::new(InMemoryRefundStore::new()),
            cache_store,
            policy,
        )
    }

    /// Fully in-memory state.
    pub fn in_memory(policy: RefundPolicy) -> Self {
        Self::in_memory_with_cache(Arc::new(InMemoryCache::new()), policy)
    }
}
