//! Refund error types.

use chrono::{DateTime, Utc};
use common::{Money, RefundId, SaleId};
use sales::SalesError;
use thiserror::Error;

/// Errors that can occur while creating or reading refunds.
///
/// Every eligibility rejection happens before any write; a stock
/// restoration failure after the refund committed is deliberately NOT an
/// error here (best-effort policy, logged and counted instead).
#[derive(Debug, Error)]
pub enum RefundError {
    /// The sale being refunded does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(SaleId),

    /// The refund does not exist.
    #[error("Refund not found: {0}")]
    NotFound(RefundId),

    /// The caller is not the sale's buyer and is not a manager.
    #[error("Sale {0} belongs to another customer")]
    NotSaleOwner(SaleId),

    /// The sale is older than the refund window allows.
    #[error("Refund window expired for sale dated {sale_date} (window: {window_days} days)")]
    WindowExpired {
        sale_date: DateTime<Utc>,
        window_days: i64,
    },

    /// The sale is already fully refunded.
    #[error("Sale {0} is already fully refunded")]
    AlreadyRefunded(SaleId),

    /// The refund would push the refunded sum past the sale total.
    #[error("Refund of {requested} exceeds the remaining refundable amount {remaining}")]
    AmountExceeded { requested: Money, remaining: Money },

    /// The client's expected total disagrees with the computed total.
    #[error("Refund total mismatch: computed {computed}, request said {expected}")]
    AmountMismatch { computed: Money, expected: Money },

    /// The request is malformed (unknown product, bad quantity, ...).
    #[error("Invalid refund request: {0}")]
    Validation(String),

    /// A sale store call failed.
    #[error(transparent)]
    Sales(#[from] SalesError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-recoverable fault occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for refund operations.
pub type Result<T> = std::result::Result<T, RefundError>;
