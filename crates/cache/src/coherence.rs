//! Invalidation of cached reads after mutations.

use std::sync::Arc;

use common::{ProductId, SaleId, StoreId, UserId};

use crate::keys;
use crate::store::CacheStore;

/// Invalidates every cache key that could contain a mutated entity.
///
/// Each mutation maps to an enumerated key set built from the typed key
/// builders in [`keys`]. Backend failures are swallowed: they are logged
/// at warn level and counted, but never propagate to the mutation path.
#[derive(Clone)]
pub struct CacheCoherence {
    store: Arc<dyn CacheStore>,
}

impl CacheCoherence {
    /// Creates a new invalidator over the given cache store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Deletes the given keys, swallowing backend errors.
    pub async fn invalidate(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }

        if let Err(e) = self.store.delete(&keys).await {
            metrics::counter!("cache_invalidation_failures").increment(1);
            tracing::warn!(error = %e, ?keys, "cache invalidation failed");
        }
    }

    /// After a direct stock mutation (adjust, bulk update).
    pub async fn after_stock_mutation(&self, store_id: StoreId, product_id: &ProductId) {
        self.invalidate(vec![keys::stock_level(store_id, product_id)])
            .await;
    }

    /// After a stock transfer: both stores' levels for the product.
    pub async fn after_transfer(
        &self,
        from_store_id: StoreId,
        to_store_id: StoreId,
        product_id: &ProductId,
    ) {
        self.invalidate(vec![
            keys::stock_level(from_store_id, product_id),
            keys::stock_level(to_store_id, product_id),
        ])
        .await;
    }

    /// After a sale: the store's stock for each sold product, the store's
    /// sales list, and the user's sales history.
    pub async fn after_sale(
        &self,
        store_id: StoreId,
        user_id: UserId,
        products: impl IntoIterator<Item = &ProductId>,
    ) {
        let mut invalidated: Vec<String> = products
            .into_iter()
            .map(|p| keys::stock_level(store_id, p))
            .collect();
        invalidated.push(keys::sales_by_store(store_id));
        invalidated.push(keys::sales_by_user(user_id));

        self.invalidate(invalidated).await;
    }

    /// After a refund: the sale entity, both stores' and users' lists, and
    /// the restored products' stock levels.
    pub async fn after_refund(
        &self,
        sale_id: SaleId,
        store_id: StoreId,
        user_id: UserId,
        products: impl IntoIterator<Item = &ProductId>,
    ) {
        let mut invalidated: Vec<String> = products
            .into_iter()
            .map(|p| keys::stock_level(store_id, p))
            .collect();
        invalidated.push(keys::sale(sale_id));
        invalidated.push(keys::refunds_by_sale(sale_id));
        invalidated.push(keys::sales_by_store(store_id));
        invalidated.push(keys::sales_by_user(user_id));
        invalidated.push(keys::refunds_by_store(store_id));
        invalidated.push(keys::refunds_by_user(user_id));

        self.invalidate(invalidated).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::InMemoryCache;
    use crate::store::CacheStore;

    async fn seed(cache: &InMemoryCache, key: &str) {
        cache
            .set(key, "cached".to_string(), Duration::from_secs(300))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn after_sale_invalidates_exactly_the_affected_keys() {
        let cache = InMemoryCache::new();
        let store = StoreId::new();
        let other_store = StoreId::new();
        let user = UserId::new();
        let product = ProductId::new("SKU-001");

        seed(&cache, &keys::stock_level(store, &product)).await;
        seed(&cache, &keys::sales_by_store(store)).await;
        seed(&cache, &keys::sales_by_user(user)).await;
        // A different store's entries must survive.
        seed(&cache, &keys::stock_level(other_store, &product)).await;
        seed(&cache, &keys::sales_by_store(other_store)).await;

        let coherence = CacheCoherence::new(Arc::new(cache.clone()));
        coherence.after_sale(store, user, [&product]).await;

        assert!(!cache.contains(&keys::stock_level(store, &product)).await);
        assert!(!cache.contains(&keys::sales_by_store(store)).await);
        assert!(!cache.contains(&keys::sales_by_user(user)).await);
        assert!(cache.contains(&keys::stock_level(other_store, &product)).await);
        assert!(cache.contains(&keys::sales_by_store(other_store)).await);
    }

    #[tokio::test]
    async fn after_refund_invalidates_sale_and_lists() {
        let cache = InMemoryCache::new();
        let store = StoreId::new();
        let user = UserId::new();
        let sale_id = SaleId::new();
        let product = ProductId::new("SKU-001");

        seed(&cache, &keys::sale(sale_id)).await;
        seed(&cache, &keys::refunds_by_sale(sale_id)).await;
        seed(&cache, &keys::refunds_by_user(user)).await;

        let coherence = CacheCoherence::new(Arc::new(cache.clone()));
        coherence
            .after_refund(sale_id, store, user, [&product])
            .await;

        assert!(!cache.contains(&keys::sale(sale_id)).await);
        assert!(!cache.contains(&keys::refunds_by_sale(sale_id)).await);
        assert!(!cache.contains(&keys::refunds_by_user(user)).await);
    }

    #[tokio::test]
    async fn backend_failure_is_swallowed() {
        let cache = InMemoryCache::new();
        cache.set_fail(true).await;

        let coherence = CacheCoherence::new(Arc::new(cache));
        // Must not panic or error.
        coherence
            .after_stock_mutation(StoreId::new(), &ProductId::new("SKU-001"))
            .await;
    }
}
