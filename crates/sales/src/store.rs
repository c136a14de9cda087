//! Sale persistence trait.

use async_trait::async_trait;
use common::{SaleId, StoreId, UserId};

use crate::error::Result;
use crate::models::{Sale, SaleLine, SaleRecord};
use crate::status::SaleStatus;

/// Persistence for sales and their lines.
///
/// `create` must write the sale and all lines in one local transaction;
/// a sale is never observable without its lines.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Persists a sale with its lines atomically.
    async fn create(&self, sale: &Sale, lines: &[SaleLine]) -> Result<()>;

    /// Loads a sale with its lines.
    async fn get(&self, sale_id: SaleId) -> Result<Option<SaleRecord>>;

    /// Sales for a store, newest first.
    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>>;

    /// Sales for a user, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Sale>>;

    /// Persists a recomputed status.
    async fn update_status(&self, sale_id: SaleId, status: SaleStatus) -> Result<()>;
}
