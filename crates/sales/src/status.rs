//! Sale status state machine.

use common::Money;
use serde::{Deserialize, Serialize};

/// The refund-derived status of a sale.
///
/// Transitions only move forward:
/// ```text
/// Active ──► PartiallyRefunded ──► Refunded
///    │                                ▲
///    └────────────────────────────────┘
/// ```
/// Status is never set directly; it is recomputed from the refund ledger
/// with [`SaleStatus::derive`] after every refund.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// No refunds recorded against the sale.
    #[default]
    Active,

    /// Refunds cover part of the sale total.
    PartiallyRefunded,

    /// Refunds cover the full sale total (terminal state).
    Refunded,
}

impl SaleStatus {
    /// Derives the status from the sale total and the refunded sum.
    ///
    /// This is the only source of status: zero refunded is `Active`,
    /// anything below the total is `PartiallyRefunded`, the total or more
    /// is `Refunded`.
    pub fn derive(total: Money, refunded: Money) -> Self {
        if refunded.cents() <= 0 {
            SaleStatus::Active
        } else if refunded >= total {
            SaleStatus::Refunded
        } else {
            SaleStatus::PartiallyRefunded
        }
    }

    /// Applies a newly derived status without ever moving backward from
    /// the terminal state.
    pub fn advance_to(self, derived: SaleStatus) -> SaleStatus {
        if self == SaleStatus::Refunded {
            SaleStatus::Refunded
        } else {
            derived
        }
    }

    /// Returns true if further refunds are accepted in this state.
    pub fn can_refund(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Refunded)
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Active => "active",
            SaleStatus::PartiallyRefunded => "partially_refunded",
            SaleStatus::Refunded => "refunded",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SaleStatus::Active),
            "partially_refunded" => Some(SaleStatus::PartiallyRefunded),
            "refunded" => Some(SaleStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    #[test]
    fn derive_with_no_refunds_is_active() {
        assert_eq!(SaleStatus::derive(cents(10000), cents(0)), SaleStatus::Active);
    }

    #[test]
    fn derive_partial() {
        assert_eq!(
            SaleStatus::derive(cents(10000), cents(4000)),
            SaleStatus::PartiallyRefunded
        );
        assert_eq!(
            SaleStatus::derive(cents(10000), cents(9999)),
            SaleStatus::PartiallyRefunded
        );
    }

    #[test]
    fn derive_full_and_over() {
        assert_eq!(
            SaleStatus::derive(cents(10000), cents(10000)),
            SaleStatus::Refunded
        );
        assert_eq!(
            SaleStatus::derive(cents(10000), cents(10001)),
            SaleStatus::Refunded
        );
    }

    #[test]
    fn zero_total_with_no_refunds_stays_active() {
        assert_eq!(SaleStatus::derive(cents(0), cents(0)), SaleStatus::Active);
    }

    #[test]
    fn refunded_is_terminal() {
        assert!(SaleStatus::Active.can_refund());
        assert!(SaleStatus::PartiallyRefunded.can_refund());
        assert!(!SaleStatus::Refunded.can_refund());
    }

    #[test]
    fn advance_never_moves_backward() {
        assert_eq!(
            SaleStatus::Refunded.advance_to(SaleStatus::Active),
            SaleStatus::Refunded
        );
        assert_eq!(
            SaleStatus::Active.advance_to(SaleStatus::PartiallyRefunded),
            SaleStatus::PartiallyRefunded
        );
    }

    #[test]
    fn parse_roundtrip() {
        for status in [
            SaleStatus::Active,
            SaleStatus::PartiallyRefunded,
            SaleStatus::Refunded,
        ] {
            assert_eq!(SaleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SaleStatus::parse("cancelled"), None);
    }
}
