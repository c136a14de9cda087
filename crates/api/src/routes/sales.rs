//! Sale endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use cache::{get_or_compute, keys};
use common::{Money, SaleId, StoreId, UserId};
use sales::{CreateSale, Sale, SaleLine, SaleRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// A sale as returned to clients, with the refund ledger summarized.
#[derive(Serialize, Deserialize)]
pub struct SaleView {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
    pub refunded_total: Money,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub store_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct StatusPatch {
    /// The client-supplied status is deliberately ignored; status is
    /// always re-derived from refund history.
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub sale_id: SaleId,
    pub status: sales::SaleStatus,
}

/// POST /sales — run the create-sale saga.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSale>,
) -> Result<(StatusCode, Json<SaleRecord>), ApiError> {
    let record = state.sales.create_sale(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /sales/{id} — load a sale with its lines and refunded total.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleView>, ApiError> {
    let sale_id = SaleId::from_uuid(id);

    let view = get_or_compute(
        state.cache.as_ref(),
        &keys::sale(sale_id),
        keys::ENTITY_TTL,
        || async {
            let record = state
                .sales
                .get_sale(sale_id)
                .await?
                .ok_or(ApiError::NotFound(format!("Sale {sale_id} not found")))?;
            let refunded_total = state
                .refunds
                .refunded_total(sale_id)
                .await
                .map_err(ApiError::Refunds)?;

            Ok::<_, ApiError>(SaleView {
                sale: record.sale,
                lines: record.lines,
                refunded_total,
            })
        },
    )
    .await?;

    Ok(Json(view))
}

/// GET /sales?store_id=…|user_id=… — cached list reads.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let sales = match (query.store_id, query.user_id) {
        (Some(store_id), _) => {
            let store_id = StoreId::from_uuid(store_id);
            get_or_compute(
                state.cache.as_ref(),
                &keys::sales_by_store(store_id),
                keys::LIST_TTL,
                || async { state.sales.sales_for_store(store_id).await },
            )
            .await?
        }
        (None, Some(user_id)) => {
            let user_id = UserId::from_uuid(user_id);
            get_or_compute(
                state.cache.as_ref(),
                &keys::sales_by_user(user_id),
                keys::LIST_TTL,
                || async { state.sales.sales_for_user(user_id).await },
            )
            .await?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either store_id or user_id is required".to_string(),
            ));
        }
    };

    Ok(Json(sales))
}

/// PATCH /sales/{id}/status — internal hook that re-derives the status
/// from refund history; the request body's status value is not trusted.
#[tracing::instrument(skip(state, _patch))]
pub async fn recompute_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(_patch): Json<StatusPatch>,
) -> Result<Json<StatusResponse>, ApiError> {
    let sale_id = SaleId::from_uuid(id);
    let status = state.refunds.recompute_status(sale_id).await?;

    Ok(Json(StatusResponse { sale_id, status }))
}
