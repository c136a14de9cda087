//! The stock ledger trait and its operation types.
//!
//! The ledger is the single source of truth for per-(store, product)
//! quantity. Every mutating operation is atomic at the storage layer: a
//! conditional update that checks and changes the quantity in one statement,
//! never a read-then-write in application code.

use async_trait::async_trait;
use common::{ProductId, StoreId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of a read-only availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// True if the current quantity covers the requested quantity.
    pub available: bool,
    /// Quantity currently on hand (zero if no record exists).
    pub current_qty: i64,
    /// How many units are missing to satisfy the request (zero if available).
    pub shortage: i64,
}

/// The kind of mutation a bulk update entry applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockOp {
    Decrement,
    Restore,
}

/// A single entry in a bulk update request.
#[derive(Debug, Clone, Deserialize)]
pub struct StockUpdate {
    pub op: StockOp,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Caller-supplied reference recorded with restore movements.
    pub reference: Option<String>,
}

/// Per-entry result of a bulk update. The batch never aborts as a whole.
#[derive(Debug)]
pub struct BulkUpdateOutcome {
    pub store_id: StoreId,
    pub product_id: ProductId,
    /// New quantity on success, the entry's own error on failure.
    pub result: Result<i64>,
}

/// Authoritative per-(store, product) stock quantities.
///
/// Implementations must guarantee that `decrement`, `restore` and `transfer`
/// are atomic: two concurrent decrements racing for the last unit must not
/// both succeed.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Checks whether `quantity` units are on hand. Read-only.
    async fn check_availability(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Availability>;

    /// Atomically subtracts `quantity` if enough is on hand.
    ///
    /// Returns the new quantity, or `InsufficientStock` without mutating
    /// anything. The check-and-subtract is a single conditional statement.
    async fn decrement(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<i64>;

    /// Atomically adds `quantity` back, creating the record if absent.
    ///
    /// `reference` (e.g. `refund-<id>`) is recorded with the movement for
    /// reconciliation. Replaying a restore with the same reference is NOT
    /// deduplicated; callers must treat a timed-out call as unknown outcome.
    async fn restore(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
        reference: &str,
    ) -> Result<i64>;

    /// Moves `quantity` units between stores in one local transaction.
    ///
    /// Fails with `InsufficientStock` if the source lacks quantity; neither
    /// side is mutated on failure. The destination record is created if
    /// absent.
    async fn transfer(
        &self,
        from_store_id: StoreId,
        to_store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()>;

    /// Applies each update independently; one entry's failure never aborts
    /// the rest of the batch.
    async fn bulk_update(&self, updates: Vec<StockUpdate>) -> Vec<BulkUpdateOutcome>;

    /// Current quantity on hand, or `None` if no record exists.
    async fn quantity(&self, store_id: StoreId, product_id: &ProductId) -> Result<Option<i64>>;

    /// Sets the absolute quantity (administrative adjustment/seeding).
    ///
    /// Rejects negative quantities; a record is created if absent.
    async fn set_quantity(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()>;
}

impl Availability {
    /// Builds an availability answer from the current quantity on hand.
    pub fn of(current_qty: i64, requested: i64) -> Self {
        Self {
            available: current_qty >= requested,
            current_qty,
            shortage: (requested - current_qty).max(0),
        }
    }
}
