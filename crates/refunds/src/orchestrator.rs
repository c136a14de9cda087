//! The refund processing orchestrator.

use std::sync::Arc;

use cache::CacheCoherence;
use chrono::Utc;
use common::{Money, ProductId, RefundId, SaleId, StoreId, UserId};
use sales::{SaleRecord, SaleStatus, SaleStore};
use stock_ledger::StockLedger;

use crate::error::{RefundError, Result};
use crate::models::{Refund, RefundLine, RefundRecord, RefundRequest, Role};
use crate::policy::RefundPolicy;
use crate::store::RefundStore;

/// Validates refund eligibility, records the refund, restores stock and
/// keeps the sale status consistent with refund history.
///
/// The refund record's durability is prioritized over immediate stock
/// consistency: once the refund has committed, a failing stock
/// restoration is logged and counted but never aborts the refund.
pub struct RefundOrchestrator {
    ledger: Arc<dyn StockLedger>,
    sales: Arc<dyn SaleStore>,
    refunds: Arc<dyn RefundStore>,
    cache: CacheCoherence,
    policy: RefundPolicy,
}

impl RefundOrchestrator {
    /// Creates a new refund orchestrator over the injected collaborators.
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        sales: Arc<dyn SaleStore>,
        refunds: Arc<dyn RefundStore>,
        cache: CacheCoherence,
        policy: RefundPolicy,
    ) -> Self {
        Self {
            ledger,
            sales,
            refunds,
            cache,
            policy,
        }
    }

    /// Processes a refund request.
    ///
    /// All eligibility checks run before any write; a rejected request
    /// leaves no trace. On success the refund and its lines are durable,
    /// stock restoration has been attempted per line, and the sale status
    /// reflects the full refund history.
    #[tracing::instrument(
        skip(self, req),
        fields(sale_id = %req.sale_id, user_id = %req.user_id)
    )]
    pub async fn create_refund(&self, req: RefundRequest) -> Result<RefundRecord> {
        metrics::counter!("refund_attempts").increment(1);
        let started = std::time::Instant::now();

        // 1. Load the sale and its refund history.
        let sale_record = self
            .sales
            .get(req.sale_id)
            .await?
            .ok_or(RefundError::SaleNotFound(req.sale_id))?;
        let sale = &sale_record.sale;

        // 2. Ownership: customers may only refund their own sales.
        if req.role == Role::Customer && req.user_id != sale.user_id {
            return Err(RefundError::NotSaleOwner(req.sale_id));
        }

        // 3. Eligibility, fail fast before any write.
        if sale.status.is_terminal() {
            return Err(RefundError::AlreadyRefunded(req.sale_id));
        }
        if self.policy.window_expired(sale.date, Utc::now()) {
            return Err(RefundError::WindowExpired {
                sale_date: sale.date,
                window_days: self.policy.window_days(),
            });
        }

        let prior = self.refunds.list_for_sale(req.sale_id).await?;
        let prior_total: Money = prior.iter().map(|r| r.refund.total).sum();
        if prior_total >= sale.total {
            return Err(RefundError::AlreadyRefunded(req.sale_id));
        }

        // 4. Compute the refund total and the lines to restore.
        let refund_id = RefundId::new();
        let (total, lines) = match &req.items {
            Some(items) => Self::lines_from_items(refund_id, &sale_record, items)?,
            None => Self::lines_for_remainder(refund_id, &sale_record, &prior, prior_total),
        };

        // 5. Cross-check against the client's own arithmetic.
        if let Some(expected) = req.expected_total
            && !self.policy.within_tolerance(total, expected)
        {
            return Err(RefundError::AmountMismatch {
                computed: total,
                expected,
            });
        }

        // 6. The refunded sum must never exceed the sale total.
        let remaining = sale.total - prior_total;
        if (prior_total + total).cents() > (sale.total + self.policy.tolerance).cents() {
            return Err(RefundError::AmountExceeded {
                requested: total,
                remaining,
            });
        }

        // 7. Persist refund + lines in one local transaction.
        let refund = Refund {
            id: refund_id,
            sale_id: sale.id,
            store_id: sale.store_id,
            user_id: sale.user_id,
            date: Utc::now(),
            total,
            reason: req.reason,
        };
        self.refunds.create(&refund, &lines).await?;

        // 8. Best-effort stock restoration. The refund is already durable;
        // a failure here leaves stock under-restored until reconciliation.
        let reference = format!("refund-{refund_id}");
        for line in &lines {
            if line.quantity == 0 {
                continue;
            }
            if let Err(e) = self
                .ledger
                .restore(
                    sale.store_id,
                    &line.product_id,
                    i64::from(line.quantity),
                    &reference,
                )
                .await
            {
                metrics::counter!("stock_restore_failures").increment(1);
                tracing::warn!(
                    store_id = %sale.store_id,
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %e,
                    "stock restoration failed; refund kept, stock needs reconciliation"
                );
            }
        }

        // 9. Recompute the status from the full refund history.
        let derived = SaleStatus::derive(sale.total, prior_total + total);
        let new_status = sale.status.advance_to(derived);
        if new_status != sale.status
            && let Err(e) = self.sales.update_status(sale.id, new_status).await
        {
            metrics::counter!("status_update_failures").increment(1);
            tracing::error!(
                sale_id = %sale.id,
                status = %new_status,
                error = %e,
                "failed to persist recomputed sale status"
            );
        }

        // 10. Invalidation runs last and cannot fail the refund.
        self.cache
            .after_refund(
                sale.id,
                sale.store_id,
                sale.user_id,
                lines.iter().map(|l| &l.product_id),
            )
            .await;

        metrics::counter!("refunds_created").increment(1);
        metrics::histogram!("refund_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            %refund_id,
            sale_id = %sale.id,
            total_cents = total.cents(),
            status = %new_status,
            "refund created"
        );

        Ok(RefundRecord {
            refund,
            lines,
        })
    }

    /// Re-derives a sale's status from its refund history and persists it
    /// if it changed. Used by the internal status endpoint; the caller's
    /// requested status is never trusted.
    pub async fn recompute_status(&self, sale_id: SaleId) -> Result<SaleStatus> {
        let sale_record = self
            .sales
            .get(sale_id)
            .await?
            .ok_or(RefundError::SaleNotFound(sale_id))?;

        let refunded: Money = self
            .refunds
            .list_for_sale(sale_id)
            .await?
            .iter()
            .map(|r| r.refund.total)
            .sum();

        let derived = SaleStatus::derive(sale_record.sale.total, refunded);
        let new_status = sale_record.sale.status.advance_to(derived);

        if new_status != sale_record.sale.status {
            self.sales.update_status(sale_id, new_status).await?;
            self.cache
                .after_refund(
                    sale_id,
                    sale_record.sale.store_id,
                    sale_record.sale.user_id,
                    std::iter::empty::<&ProductId>(),
                )
                .await;
        }

        Ok(new_status)
    }

    /// Loads a refund with its lines.
    pub async fn get_refund(&self, refund_id: RefundId) -> Result<Option<RefundRecord>> {
        self.refunds.get(refund_id).await
    }

    /// All refunds against a sale, oldest first.
    pub async fn refunds_for_sale(&self, sale_id: SaleId) -> Result<Vec<RefundRecord>> {
        self.refunds.list_for_sale(sale_id).await
    }

    /// Refunds for a store, newest first.
    pub async fn refunds_for_store(&self, store_id: StoreId) -> Result<Vec<Refund>> {
        self.refunds.list_for_store(store_id).await
    }

    /// Refunds for a user, newest first.
    pub async fn refunds_for_user(&self, user_id: UserId) -> Result<Vec<Refund>> {
        self.refunds.list_for_user(user_id).await
    }

    /// Total refunded against a sale so far.
    pub async fn refunded_total(&self, sale_id: SaleId) -> Result<Money> {
        Ok(self
            .refunds
            .list_for_sale(sale_id)
            .await?
            .iter()
            .map(|r| r.refund.total)
            .sum())
    }

    /// Builds refund lines from an explicit item list.
    ///
    /// Each item must name a product on the sale with a positive quantity
    /// no larger than the quantity sold; the computed total is the sum of
    /// the item subtotals.
    fn lines_from_items(
        refund_id: RefundId,
        sale_record: &SaleRecord,
        items: &[crate::models::RefundItem],
    ) -> Result<(Money, Vec<RefundLine>)> {
        if items.is_empty() {
            return Err(RefundError::Validation(
                "refund items must not be empty when given".to_string(),
            ));
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let sold = sale_record
                .lines
                .iter()
                .find(|l| l.product_id == item.product_id)
                .ok_or_else(|| {
                    RefundError::Validation(format!(
                        "product {} is not part of the sale",
                        item.product_id
                    ))
                })?;

            if item.quantity == 0 {
                return Err(RefundError::Validation(format!(
                    "refund quantity for {} must be positive",
                    item.product_id
                )));
            }
            if item.quantity > sold.quantity {
                return Err(RefundError::Validation(format!(
                    "refund quantity {} for {} exceeds sold quantity {}",
                    item.quantity, item.product_id, sold.quantity
                )));
            }
            if item.unit_price.is_negative() {
                return Err(RefundError::Validation(format!(
                    "unit price for {} must not be negative",
                    item.product_id
                )));
            }

            lines.push(RefundLine {
                refund_id,
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }

        let total = lines.iter().map(RefundLine::subtotal).sum();
        Ok((total, lines))
    }

    /// Builds refund lines for a full refund of everything not yet
    /// refunded.
    ///
    /// Quantities are the sold quantities minus what earlier refund lines
    /// already restored; the total is the monetary remainder of the sale,
    /// which is authoritative even if prior refunds used ad-hoc prices.
    fn lines_for_remainder(
        refund_id: RefundId,
        sale_record: &SaleRecord,
        prior: &[RefundRecord],
        prior_total: Money,
    ) -> (Money, Vec<RefundLine>) {
        let lines: Vec<RefundLine> = sale_record
            .lines
            .iter()
            .filter_map(|sold| {
                let already_refunded: u32 = prior
                    .iter()
                    .flat_map(|r| &r.lines)
                    .filter(|l| l.product_id == sold.product_id)
                    .map(|l| l.quantity)
                    .sum();
                let remaining = sold.quantity.saturating_sub(already_refunded);
                (remaining > 0).then(|| RefundLine {
                    refund_id,
                    product_id: sold.product_id.clone(),
                    quantity: remaining,
                    unit_price: sold.unit_price,
                })
            })
            .collect();

        (sale_record.sale.total - prior_total, lines)
    }
}
