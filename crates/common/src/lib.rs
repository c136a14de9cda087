pub mod ids;
pub mod money;

pub use ids::{ProductId, RefundId, SaleId, StoreId, UserId};
pub use money::Money;
