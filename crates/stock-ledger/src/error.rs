use common::{ProductId, StoreId};
use thiserror::Error;

/// Errors that can occur when mutating or reading the stock ledger.
#[derive(Debug, Error)]
pub enum StockError {
    /// The requested quantity exceeds what is on hand.
    #[error(
        "Insufficient stock for {product_id} at store {store_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        store_id: StoreId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// No stock record exists for the (store, product) pair.
    #[error("No stock record for {product_id} at store {store_id}")]
    NotFound {
        store_id: StoreId,
        product_id: ProductId,
    },

    /// The quantity is not usable for this operation.
    #[error("Invalid quantity {quantity}: {reason}")]
    InvalidQuantity { quantity: i64, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The storage backend is unavailable.
    #[error("Stock backend unavailable: {0}")]
    Backend(String),
}

impl StockError {
    fn invalid_quantity(quantity: i64, reason: &str) -> Self {
        StockError::InvalidQuantity {
            quantity,
            reason: reason.to_string(),
        }
    }

    /// Rejects quantities that are zero or negative.
    pub(crate) fn require_positive(quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(Self::invalid_quantity(quantity, "must be positive"));
        }
        Ok(())
    }

    /// Rejects negative quantities (zero is allowed).
    pub(crate) fn require_non_negative(quantity: i64) -> Result<()> {
        if quantity < 0 {
            return Err(Self::invalid_quantity(quantity, "must not be negative"));
        }
        Ok(())
    }
}

/// Result type for stock ledger operations.
pub type Result<T> = std::result::Result<T, StockError>;
