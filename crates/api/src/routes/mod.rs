pub mod health;
pub mod metrics;
pub mod refunds;
pub mod sales;
pub mod stock;
