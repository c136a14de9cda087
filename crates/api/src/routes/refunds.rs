//! Refund endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use cache::{get_or_compute, keys};
use common::{RefundId, SaleId, StoreId, UserId};
use refunds::{Refund, RefundError, RefundRecord, RefundRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub store_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// POST /refunds — validate and record a refund.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<RefundRequest>,
) -> Result<(StatusCode, Json<RefundRecord>), ApiError> {
    let record = state.refunds.create_refund(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /refunds/{id} — load a refund with its lines.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundRecord>, ApiError> {
    let refund_id = RefundId::from_uuid(id);
    let record = state
        .refunds
        .get_refund(refund_id)
        .await?
        .ok_or(RefundError::NotFound(refund_id))?;

    Ok(Json(record))
}

/// GET /sales/{id}/refunds — all refunds against a sale, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_sale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RefundRecord>>, ApiError> {
    let sale_id = SaleId::from_uuid(id);

    let records = get_or_compute(
        state.cache.as_ref(),
        &keys::refunds_by_sale(sale_id),
        keys::LIST_TTL,
        || async { state.refunds.refunds_for_sale(sale_id).await },
    )
    .await?;

    Ok(Json(records))
}

/// GET /refunds?store_id=…|user_id=… — cached list reads.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Refund>>, ApiError> {
    let refunds = match (query.store_id, query.user_id) {
        (Some(store_id), _) => {
            let store_id = StoreId::from_uuid(store_id);
            get_or_compute(
                state.cache.as_ref(),
                &keys::refunds_by_store(store_id),
                keys::LIST_TTL,
                || async { state.refunds.refunds_for_store(store_id).await },
            )
            .await?
        }
        (None, Some(user_id)) => {
            let user_id = UserId::from_uuid(user_id);
            get_or_compute(
                state.cache.as_ref(),
                &keys::refunds_by_user(user_id),
                keys::LIST_TTL,
                || async { state.refunds.refunds_for_user(user_id).await },
            )
            .await?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either store_id or user_id is required".to_string(),
            ));
        }
    };

    Ok(Json(refunds))
}
