//! Sale error types.

use common::SaleId;
use stock_ledger::StockError;
use thiserror::Error;

/// Errors that can occur while creating or reading sales.
#[derive(Debug, Error)]
pub enum SalesError {
    /// The cart is malformed (empty, zero quantity, negative price).
    #[error("Invalid sale request: {0}")]
    Validation(String),

    /// A stock ledger call failed; `InsufficientStock` carries the failing
    /// product and shortage.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The sale does not exist.
    #[error("Sale not found: {0}")]
    NotFound(SaleId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage failed in a way that may have left stock inconsistent, or
    /// another non-recoverable fault occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for sale operations.
pub type Result<T> = std::result::Result<T, SalesError>;
