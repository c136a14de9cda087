//! API error type mapping the core error taxonomy to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use refunds::RefundError;
use sales::SalesError;
use stock_ledger::StockError;

/// API-level error that renders as `{"code": ..., "error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// A sale operation failed.
    Sales(SalesError),
    /// A refund operation failed.
    Refunds(RefundError),
    /// A stock ledger operation failed.
    Stock(StockError),
    /// Malformed request outside the domain validations.
    BadRequest(String),
    /// Resource not found at the routing layer.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Sales(err) => sales_error_to_response(err),
            ApiError::Refunds(err) => refund_error_to_response(err),
            ApiError::Stock(err) => stock_error_to_response(err),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let body = serde_json::json!({ "code": code, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn stock_error_to_response(err: StockError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        StockError::InsufficientStock { .. } => {
            (StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
        }
        StockError::NotFound { .. } => (StatusCode::NOT_FOUND, "STOCK_NOT_FOUND", message),
        StockError::InvalidQuantity { .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
        }
        StockError::Database(_) | StockError::Backend(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
        }
    }
}

fn sales_error_to_response(err: SalesError) -> (StatusCode, &'static str, String) {
    match err {
        SalesError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        SalesError::Stock(inner) => stock_error_to_response(inner),
        SalesError::NotFound(_) => (StatusCode::NOT_FOUND, "SALE_NOT_FOUND", err.to_string()),
        SalesError::Database(_) | SalesError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            err.to_string(),
        ),
    }
}

fn refund_error_to_response(err: RefundError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        RefundError::SaleNotFound(_) => (StatusCode::NOT_FOUND, "SALE_NOT_FOUND", message),
        RefundError::NotFound(_) => (StatusCode::NOT_FOUND, "REFUND_NOT_FOUND", message),
        RefundError::NotSaleOwner(_) => (StatusCode::FORBIDDEN, "NOT_SALE_OWNER", message),
        RefundError::WindowExpired { .. } => {
            (StatusCode::BAD_REQUEST, "REFUND_WINDOW_EXPIRED", message)
        }
        RefundError::AlreadyRefunded(_) => (StatusCode::BAD_REQUEST, "ALREADY_REFUNDED", message),
        RefundError::AmountExceeded { .. } => {
            (StatusCode::BAD_REQUEST, "REFUND_AMOUNT_EXCEEDED", message)
        }
        RefundError::AmountMismatch { .. } => (StatusCode::BAD_REQUEST, "AMOUNT_MISMATCH", message),
        RefundError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        RefundError::Sales(inner) => sales_error_to_response(inner),
        RefundError::Database(_) | RefundError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
        }
    }
}

impl From<SalesError> for ApiError {
    fn from(err: SalesError) -> Self {
        ApiError::Sales(err)
    }
}

impl From<RefundError> for ApiError {
    fn from(err: RefundError) -> Self {
        ApiError::Refunds(err)
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError::Stock(err)
    }
}
