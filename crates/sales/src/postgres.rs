//! PostgreSQL-backed sale store.

use async_trait::async_trait;
use common::{Money, ProductId, SaleId, StoreId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Result, SalesError};
use crate::models::{Sale, SaleLine, SaleRecord};
use crate::status::SaleStatus;
use crate::store::SaleStore;

/// Sale store backed by the `sales` and `sale_lines` tables.
#[derive(Clone)]
pub struct PostgresSaleStore {
    pool: PgPool,
}

impl PostgresSaleStore {
    /// Creates a new PostgreSQL sale store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_sale(row: &PgRow) -> Result<Sale> {
        let status_raw: String = row.try_get("status").map_err(SalesError::Database)?;
        let status = SaleStatus::parse(&status_raw)
            .ok_or_else(|| SalesError::Internal(format!("unknown sale status '{status_raw}'")))?;

        Ok(Sale {
            id: SaleId::from_uuid(row.try_get::<Uuid, _>("id").map_err(SalesError::Database)?),
            store_id: StoreId::from_uuid(
                row.try_get::<Uuid, _>("store_id")
                    .map_err(SalesError::Database)?,
            ),
            user_id: UserId::from_uuid(
                row.try_get::<Uuid, _>("user_id")
                    .map_err(SalesError::Database)?,
            ),
            date: row.try_get("date").map_err(SalesError::Database)?,
            total: Money::from_cents(row.try_get("total_cents").map_err(SalesError::Database)?),
            status,
        })
    }

    fn row_to_line(sale_id: SaleId, row: &PgRow) -> Result<SaleLine> {
        Ok(SaleLine {
            sale_id,
            product_id: ProductId::new(
                row.try_get::<String, _>("product_id")
                    .map_err(SalesError::Database)?,
            ),
            quantity: row
                .try_get::<i32, _>("quantity")
                .map_err(SalesError::Database)? as u32,
            unit_price: Money::from_cents(
                row.try_get("unit_price_cents")
                    .map_err(SalesError::Database)?,
            ),
        })
    }
}

#[async_trait]
impl SaleStore for PostgresSaleStore {
    async fn create(&self, sale: &Sale, lines: &[SaleLine]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, store_id, user_id, date, total_cents, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(sale.store_id.as_uuid())
        .bind(sale.user_id.as_uuid())
        .bind(sale.date)
        .bind(sale.total.cents())
        .bind(sale.status.as_str())
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (sale_id, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(sale.id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, sale_id: SaleId) -> Result<Option<SaleRecord>> {
        let row = sqlx::query(
            "SELECT id, store_id, user_id, date, total_cents, status FROM sales WHERE id = $1",
        )
        .bind(sale_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let sale = Self::row_to_sale(&row)?;

        let line_rows = sqlx::query(
            r#"
            SELECT product_id, quantity, unit_price_cents
            FROM sale_lines
            WHERE sale_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(sale_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .iter()
            .map(|r| Self::row_to_line(sale_id, r))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(SaleRecord { sale, lines }))
    }

    async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Sale>> {
        let rows = sqlx::query(
            r#"
            SELECT id, store_id, user_id, date, total_cents, status
            FROM sales
            WHERE store_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(store_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_sale).collect()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Sale>> {
        let rows = sqlx::query(
            r#"
            SELECT id, store_id, user_id, date, total_cents, status
            FROM sales
            WHERE user_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_sale).collect()
    }

    async fn update_status(&self, sale_id: SaleId, status: SaleStatus) -> Result<()> {
        let result = sqlx::query("UPDATE sales SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(sale_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SalesError::NotFound(sale_id));
        }
        Ok(())
    }
}
