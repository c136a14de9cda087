//! HTTP API for the stock/sale/refund transaction core.
//!
//! Exposes the sale and refund orchestrators and the stock ledger over
//! axum, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the axum application router with all routes and shared state.
pub fn create_app(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/sales", post(routes::sales::create))
        .route("/sales", get(routes::sales::list))
        .route("/sales/{id}", get(routes::sales::get))
        .route("/sales/{id}/status", patch(routes::sales::recompute_status))
        .route("/sales/{id}/refunds", get(routes::refunds::list_for_sale))
        .route("/refunds", post(routes::refunds::create))
        .route("/refunds", get(routes::refunds::list))
        .route("/refunds/{id}", get(routes::refunds::get))
        .route(
            "/stock/{store_id}/{product_id}",
            get(routes::stock::availability),
        )
        .route("/stock/adjust", post(routes::stock::adjust))
        .route("/stock/bulk-update", post(routes::stock::bulk_update))
        .route("/stock/transfer", post(routes::stock::transfer))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
