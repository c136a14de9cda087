//! Refund persistence trait.

use async_trait::async_trait;
use common::{RefundId, SaleId, StoreId, UserId};

use crate::error::Result;
use crate::models::{Refund, RefundLine, RefundRecord};

/// Persistence for refunds and their lines.
///
/// `create` must write the refund and all lines in one local transaction.
#[async_trait]
pub trait RefundStore: Send + Sync {
    /// Persists a refund with its lines atomically.
    async fn create(&self, refund: &Refund, lines: &[RefundLine]) -> Result<()>;

    /// Loads a refund with its lines.
    async fn get(&self, refund_id: RefundId) -> Result<Option<RefundRecord>>;

    /// All refunds recorded against a sale, oldest first.
    async fn list_for_sale(&self, sale_id: SaleId) -> Result<Vec<RefundRecord>>;

    /// Refunds for a store, newest first.
    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Refund>>;

    /// Refunds for a user, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Refund>>;
}
