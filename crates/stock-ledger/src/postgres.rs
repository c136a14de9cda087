//! PostgreSQL-backed stock ledger.

use async_trait::async_trait;
use common::{ProductId, StoreId};
use sqlx::PgPool;

use crate::error::{Result, StockError};
use crate::ledger::{Availability, BulkUpdateOutcome, StockLedger, StockOp, StockUpdate};

/// Stock ledger backed by a `stock` table with a `quantity >= 0` CHECK.
///
/// All mutations are single conditional statements (or one local
/// transaction for `transfer`), so concurrent callers serialize at the
/// database row, not in application code.
#[derive(Clone)]
pub struct PostgresStockLedger {
    pool: PgPool,
}

impl PostgresStockLedger {
    /// Creates a new PostgreSQL stock ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_quantity<'e, E>(
        executor: E,
        store_id: StoreId,
        product_id: &ProductId,
    ) -> Result<Option<i64>>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let quantity: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM stock WHERE store_id = $1 AND product_id = $2",
        )
        .bind(store_id.as_uuid())
        .bind(product_id.as_str())
        .fetch_optional(executor)
        .await?;

        Ok(quantity)
    }

    async fn record_movement<'e, E>(
        executor: E,
        store_id: StoreId,
        product_id: &ProductId,
        delta: i64,
        reference: Option<&str>,
    ) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (store_id, product_id, delta, reference)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(delta)
        .bind(reference)
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StockLedger for PostgresStockLedger {
    async fn check_availability(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Availability> {
        StockError::require_positive(quantity)?;

        let current = Self::current_quantity(&self.pool, store_id, product_id)
            .await?
            .unwrap_or(0);

        Ok(Availability::of(current, quantity))
    }

    async fn decrement(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<i64> {
        StockError::require_positive(quantity)?;

        let mut tx = self.pool.begin().await?;

        // Single conditional update: the quantity check and the subtraction
        // happen in one statement, so a concurrent decrement cannot observe
        // the same last unit.
        let new_qty: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock
            SET quantity = quantity - $3, updated_at = NOW()
            WHERE store_id = $1 AND product_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_qty) = new_qty else {
            // No row matched: either the record is missing or it is short.
            return match Self::current_quantity(&mut *tx, store_id, product_id).await? {
                Some(available) => Err(StockError::InsufficientStock {
                    store_id,
                    product_id: product_id.clone(),
                    requested: quantity,
                    available,
                }),
                None => Err(StockError::NotFound {
                    store_id,
                    product_id: product_id.clone(),
                }),
            };
        };

        Self::record_movement(&mut *tx, store_id, product_id, -quantity, None).await?;
        tx.commit().await?;

        tracing::debug!(%store_id, %product_id, quantity, new_qty, "stock decremented");
        Ok(new_qty)
    }

    async fn restore(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
        reference: &str,
    ) -> Result<i64> {
        StockError::require_positive(quantity)?;

        let mut tx = self.pool.begin().await?;

        let new_qty: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO stock (store_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (store_id, product_id)
            DO UPDATE SET quantity = stock.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING quantity
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        Self::record_movement(&mut *tx, store_id, product_id, quantity, Some(reference)).await?;
        tx.commit().await?;

        tracing::debug!(%store_id, %product_id, quantity, new_qty, reference, "stock restored");
        Ok(new_qty)
    }

    async fn transfer(
        &self,
        from_store_id: StoreId,
        to_store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()> {
        StockError::require_positive(quantity)?;

        let mut tx = self.pool.begin().await?;

        let decremented: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE stock
            SET quantity = quantity - $3, updated_at = NOW()
            WHERE store_id = $1 AND product_id = $2 AND quantity >= $3
            RETURNING quantity
            "#,
        )
        .bind(from_store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity)
        .fetch_optional(&mut *tx)
        .await?;

        if decremented.is_none() {
            // Dropping the transaction rolls it back; nothing was mutated.
            return match Self::current_quantity(&mut *tx, from_store_id, product_id).await? {
                Some(available) => Err(StockError::InsufficientStock {
                    store_id: from_store_id,
                    product_id: product_id.clone(),
                    requested: quantity,
                    available,
                }),
                None => Err(StockError::NotFound {
                    store_id: from_store_id,
                    product_id: product_id.clone(),
                }),
            };
        }

        sqlx::query(
            r#"
            INSERT INTO stock (store_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (store_id, product_id)
            DO UPDATE SET quantity = stock.quantity + EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(to_store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        Self::record_movement(&mut *tx, from_store_id, product_id, -quantity, None).await?;
        Self::record_movement(&mut *tx, to_store_id, product_id, quantity, None).await?;
        tx.commit().await?;

        tracing::debug!(
            %from_store_id, %to_store_id, %product_id, quantity,
            "stock transferred"
        );
        Ok(())
    }

    async fn bulk_update(&self, updates: Vec<StockUpdate>) -> Vec<BulkUpdateOutcome> {
        let mut outcomes = Vec::with_capacity(updates.len());

        for update in updates {
            let result = match update.op {
                StockOp::Decrement => {
                    self.decrement(update.store_id, &update.product_id, update.quantity)
                        .await
                }
                StockOp::Restore => {
                    let reference = update.reference.as_deref().unwrap_or("bulk-update");
                    self.restore(
                        update.store_id,
                        &update.product_id,
                        update.quantity,
                        reference,
                    )
                    .await
                }
            };

            outcomes.push(BulkUpdateOutcome {
                store_id: update.store_id,
                product_id: update.product_id,
                result,
            });
        }

        outcomes
    }

    async fn quantity(&self, store_id: StoreId, product_id: &ProductId) -> Result<Option<i64>> {
        Self::current_quantity(&self.pool, store_id, product_id).await
    }

    async fn set_quantity(
        &self,
        store_id: StoreId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<()> {
        StockError::require_non_negative(quantity)?;

        sqlx::query(
            r#"
            INSERT INTO stock (store_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (store_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(store_id.as_uuid())
        .bind(product_id.as_str())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
