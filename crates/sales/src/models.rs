//! Sale domain types.

use chrono::{DateTime, Utc};
use common::{Money, ProductId, SaleId, StoreId, UserId};
use serde::{Deserialize, Serialize};

use crate::status::SaleStatus;

/// A persisted sale. Everything except `status` is immutable after
/// creation, and `status` only changes through refund-driven
/// recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    /// Sum of line subtotals.
    pub total: Money,
    pub status: SaleStatus,
}

/// One line of a sale. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl SaleLine {
    /// The line's contribution to the sale total.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A sale together with its lines, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

/// One item of an incoming cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    /// Creates a new cart item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// The item's contribution to the cart total.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Command to create a sale from a validated cart.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSale {
    pub user_id: UserId,
    pub store_id: StoreId,
    pub items: Vec<CartItem>,
}

impl CreateSale {
    /// Total of all cart items.
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_subtotal_multiplies_quantity() {
        let line = SaleLine {
            sale_id: SaleId::new(),
            product_id: ProductId::new("SKU-001"),
            quantity: 3,
            unit_price: Money::from_cents(1000),
        };
        assert_eq!(line.subtotal().cents(), 3000);
    }

    #[test]
    fn cart_total_sums_items() {
        let cmd = CreateSale {
            user_id: UserId::new(),
            store_id: StoreId::new(),
            items: vec![
                CartItem::new("SKU-001", 2, Money::from_cents(1000)),
                CartItem::new("SKU-002", 1, Money::from_cents(2500)),
            ],
        };
        assert_eq!(cmd.total().cents(), 4500);
    }

    #[test]
    fn sale_record_serialization_roundtrip() {
        let sale = Sale {
            id: SaleId::new(),
            store_id: StoreId::new(),
            user_id: UserId::new(),
            date: Utc::now(),
            total: Money::from_cents(4500),
            status: SaleStatus::Active,
        };
        let record = SaleRecord {
            lines: vec![SaleLine {
                sale_id: sale.id,
                product_id: ProductId::new("SKU-001"),
                quantity: 2,
                unit_price: Money::from_cents(1000),
            }],
            sale,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: SaleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
