//! Refund eligibility policy.

use chrono::{DateTime, Duration, Utc};
use common::Money;

/// Policy constants for refund eligibility.
#[derive(Debug, Clone, Copy)]
pub struct RefundPolicy {
    /// How long after the sale date refunds are accepted.
    pub window: Duration,
    /// Rounding tolerance for total comparisons.
    pub tolerance: Money,
}

impl RefundPolicy {
    /// Creates a policy with the given window in days and the default
    /// 1-cent tolerance.
    pub fn with_window_days(days: i64) -> Self {
        Self {
            window: Duration::days(days),
            ..Self::default()
        }
    }

    /// Returns true if the sale is too old to refund at `now`.
    pub fn window_expired(&self, sale_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - sale_date > self.window
    }

    /// The window length in whole days, for error messages.
    pub fn window_days(&self) -> i64 {
        self.window.num_days()
    }

    /// Returns true if two totals agree within the rounding tolerance.
    pub fn within_tolerance(&self, a: Money, b: Money) -> bool {
        a.abs_diff(b) <= self.tolerance.cents()
    }
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(30),
            tolerance: Money::from_cents(1),
        }
    }
}
