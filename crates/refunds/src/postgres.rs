//! PostgreSQL-backed refund store.

use async_trait::async_trait;
use common::{Money, ProductId, RefundId, SaleId, StoreId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{RefundError, Result};
use crate::models::{Refund, RefundLine, RefundRecord};
use crate::store::RefundStore;

/// Refund store backed by the `refunds` and `refund_lines` tables.
#[derive(Clone)]
pub struct PostgresRefundStore {
    pool: PgPool,
}

impl PostgresRefundStore {
    /// Creates a new PostgreSQL refund store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_refund(row: &PgRow) -> Result<Refund> {
        Ok(Refund {
            id: RefundId::from_uuid(row.try_get::<Uuid, _>("id").map_err(RefundError::Database)?),
            sale_id: SaleId::from_uuid(
                row.try_get::<Uuid, _>("sale_id")
                    .map_err(RefundError::Database)?,
            ),
            store_id: StoreId::from_uuid(
                row.try_get::<Uuid, _>("store_id")
                    .map_err(RefundError::Database)?,
            ),
            user_id: UserId::from_uuid(
                row.try_get::<Uuid, _>("user_id")
                    .map_err(RefundError::Database)?,
            ),
            date: row.try_get("date").map_err(RefundError::Database)?,
            total: Money::from_cents(row.try_get("total_cents").map_err(RefundError::Database)?),
            reason: row.try_get("reason").map_err(RefundError::Database)?,
        })
    }

    fn row_to_line(refund_id: RefundId, row: &PgRow) -> Result<RefundLine> {
        Ok(RefundLine {
            refund_id,
            product_id: ProductId::new(
                row.try_get::<String, _>("product_id")
                    .map_err(RefundError::Database)?,
            ),
            quantity: row
                .try_get::<i32, _>("quantity")
                .map_err(RefundError::Database)? as u32,
            unit_price: Money::from_cents(
                row.try_get("unit_price_cents")
                    .map_err(RefundError::Database)?,
            ),
        })
    }

    async fn lines_for(&self, refund_id: RefundId) -> Result<Vec<RefundLine>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM refund_lines
            WHERE refund_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(refund_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| Self::row_to_line(refund_id, r)).collect()
    }
}

#[async_trait]
impl RefundStore for PostgresRefundStore {
    async fn create(&self, refund: &Refund, lines: &[RefundLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO refunds (id, sale_id, store_id, user_id, date, total_cents, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(refund.id.as_uuid())
        .bind(refund.sale_id.as_uuid())
        .bind(refund.store_id.as_uuid())
        .bind(refund.user_id.as_uuid())
        .bind(refund.date)
        .bind(refund.total.cents())
        .bind(&refund.reason)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO refund_lines (refund_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(refund.id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, refund_id: RefundId) -> Result<Option<RefundRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, sale_id, store_id, user_id, date, total_cents, reason
            FROM refunds
            WHERE id = $1
            "#,
        )
        .bind(refund_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let refund = Self::row_to_refund(&row)?;
        let lines = self.lines_for(refund_id).await?;

        Ok(Some(RefundRecord { refund, lines }))
    }

    async fn list_for_sale(&self, sale_id: SaleId) -> Result<Vec<RefundRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, store_id, user_id, date, total_cents, reason
            FROM refunds
            WHERE sale_id = $1
            ORDER BY date ASC
            "#,
        )
        .bind(sale_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let refund = Self::row_to_refund(row)?;
            let lines = self.lines_for(refund.id).await?;
            records.push(RefundRecord { refund, lines });
        }
        Ok(records)
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Refund>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, store_id, user_id, date, total_cents, reason
            FROM refunds
            WHERE store_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(store_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_refund).collect()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Refund>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, store_id, user_id, date, total_cents, reason
            FROM refunds
            WHERE user_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_refund).collect()
    }
}
