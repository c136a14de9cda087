//! Typed cache key builders and the per-resource TTL policy.
//!
//! Every cached resource has exactly one key builder, and every mutation
//! invalidates an enumerated set of these keys. There are no wildcard
//! scans; the TTLs below are the backstop for anything a bug misses.

use std::time::Duration;

use common::{ProductId, SaleId, StoreId, UserId};

/// TTL for stock-level reads. Short: stock changes on every sale.
pub const STOCK_TTL: Duration = Duration::from_secs(60);

/// TTL for list/history reads.
pub const LIST_TTL: Duration = Duration::from_secs(300);

/// TTL for single-entity reads.
pub const ENTITY_TTL: Duration = Duration::from_secs(600);

/// Stock level for one (store, product) pair.
pub fn stock_level(store_id: StoreId, product_id: &ProductId) -> String {
    format!("stock:{store_id}:{product_id}")
}

/// A single sale with its lines.
pub fn sale(sale_id: SaleId) -> String {
    format!("sale:{sale_id}")
}

/// Sales list for a store.
pub fn sales_by_store(store_id: StoreId) -> String {
    format!("sales:store:{store_id}")
}

/// Sales history for a user.
pub fn sales_by_user(user_id: UserId) -> String {
    format!("sales:user:{user_id}")
}

/// Refunds recorded against a sale.
pub fn refunds_by_sale(sale_id: SaleId) -> String {
    format!("refunds:sale:{sale_id}")
}

/// Refunds list for a store.
pub fn refunds_by_store(store_id: StoreId) -> String {
    format!("refunds:store:{store_id}")
}

/// Refunds history for a user.
pub fn refunds_by_user(user_id: UserId) -> String {
    format!("refunds:user:{user_id}")
}
