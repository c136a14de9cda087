//! Stock ledger endpoints (internal surface for the orchestrators and
//! back-office tooling).

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use cache::{get_or_compute, keys};
use common::{ProductId, StoreId};
use serde::{Deserialize, Serialize};
use stock_ledger::{Availability, StockUpdate};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    /// Quantity to check for; defaults to one unit.
    pub qty: Option<i64>,
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Serialize)]
pub struct AdjustResponse {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct TransferRequest {
    pub from_store_id: StoreId,
    pub to_store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct BulkUpdateRequest {
    pub updates: Vec<StockUpdate>,
}

#[derive(Serialize)]
pub struct BulkEntryResponse {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub ok: bool,
    pub new_quantity: Option<i64>,
    pub error: Option<String>,
}

/// GET /stock/{store_id}/{product_id}?qty=… — cached availability check.
#[tracing::instrument(skip(state, query))]
pub async fn availability(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(Uuid, String)>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Availability>, ApiError> {
    let store_id = StoreId::from_uuid(store_id);
    let product_id = ProductId::new(product_id);
    let qty = query.qty.unwrap_or(1);
    if qty <= 0 {
        return Err(ApiError::BadRequest("qty must be positive".to_string()));
    }

    // The cached value is the raw quantity so one entry serves any
    // requested qty.
    let current = get_or_compute(
        state.cache.as_ref(),
        &keys::stock_level(store_id, &product_id),
        keys::STOCK_TTL,
        || async {
            Ok::<_, ApiError>(
                state
                    .stock
                    .quantity(store_id, &product_id)
                    .await?
                    .unwrap_or(0),
            )
        },
    )
    .await?;

    Ok(Json(Availability::of(current, qty)))
}

/// POST /stock/adjust — administrative absolute quantity write.
#[tracing::instrument(skip(state, req))]
pub async fn adjust(
    State(state): State<AppState>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    state
        .stock
        .set_quantity(req.store_id, &req.product_id, req.quantity)
        .await?;
    state
        .coherence
        .after_stock_mutation(req.store_id, &req.product_id)
        .await;

    Ok(Json(AdjustResponse {
        store_id: req.store_id,
        product_id: req.product_id,
        quantity: req.quantity,
    }))
}

/// POST /stock/transfer — move quantity between stores atomically.
#[tracing::instrument(skip(state, req))]
pub async fn transfer(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .stock
        .transfer(
            req.from_store_id,
            req.to_store_id,
            &req.product_id,
            req.quantity,
        )
        .await?;
    state
        .coherence
        .after_transfer(req.from_store_id, req.to_store_id, &req.product_id)
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /stock/bulk-update — per-entry application, the batch never
/// aborts on a single entry's failure.
#[tracing::instrument(skip(state, req), fields(entries = req.updates.len()))]
pub async fn bulk_update(
    State(state): State<AppState>,
    Json(req): Json<BulkUpdateRequest>,
) -> Result<Json<Vec<BulkEntryResponse>>, ApiError> {
    let outcomes = state.stock.bulk_update(req.updates).await;

    let mut responses = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let response = match outcome.result {
            Ok(new_quantity) => {
                state
                    .coherence
                    .after_stock_mutation(outcome.store_id, &outcome.product_id)
                    .await;
                BulkEntryResponse {
                    store_id: outcome.store_id,
                    product_id: outcome.product_id,
                    ok: true,
                    new_quantity: Some(new_quantity),
                    error: None,
                }
            }
            Err(e) => BulkEntryResponse {
                store_id: outcome.store_id,
                product_id: outcome.product_id,
                ok: false,
                new_quantity: None,
                error: Some(e.to_string()),
            },
        };
        responses.push(response);
    }

    Ok(Json(responses))
}
