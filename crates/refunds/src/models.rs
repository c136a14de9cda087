//! Refund domain types.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, RefundId, SaleId, StoreId, UserId};
use serde::{Deserialize, Serialize};

/// A persisted refund. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: RefundId,
    pub sale_id: SaleId,
    pub store_id: StoreId,
    /// The customer the refund is credited to (the sale's buyer).
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub total: Money,
    pub reason: String,
}

/// One line of a refund. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundLine {
    pub refund_id: RefundId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl RefundLine {
    /// The line's contribution to the refund total.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A refund together with its lines, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub refund: Refund,
    pub lines: Vec<RefundLine>,
}

/// One item of a partial refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl RefundItem {
    /// Creates a new refund item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// The item's contribution to the computed refund total.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Role claim passed through from the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May only refund their own sales.
    #[default]
    Customer,
    /// May refund any sale.
    Manager,
}

/// Command to refund a sale, fully or partially.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub sale_id: SaleId,
    /// The caller's identity, as asserted upstream.
    pub user_id: UserId,
    #[serde(default)]
    pub role: Role,
    pub reason: String,
    /// Omitted for a full refund of everything not yet refunded.
    pub items: Option<Vec<RefundItem>>,
    /// Client's own total, cross-checked against the computed one.
    pub expected_total: Option<Money>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_item_subtotal() {
        let item = RefundItem::new("SKU-001", 3, Money::from_cents(500));
        assert_eq!(item.subtotal().cents(), 1500);
    }

    #[test]
    fn role_defaults_to_customer() {
        let json = serde_json::json!({
            "sale_id": uuid::Uuid::new_v4(),
            "user_id": uuid::Uuid::new_v4(),
            "reason": "damaged item",
            "items": null,
            "expected_total": null
        });
        let req: RefundRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.role, Role::Customer);
        assert!(req.items.is_none());
    }
}
