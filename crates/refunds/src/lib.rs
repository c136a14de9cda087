pub mod error;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod postgres;
pub mod store;

pub use error::{RefundError, Result};
pub use memory::InMemoryRefundStore;
pub use models::{Refund, RefundItem, RefundLine, RefundRecord, RefundRequest, Role};
pub use orchestrator::RefundOrchestrator;
pub use policy::RefundPolicy;
pub use postgres::PostgresRefundStore;
pub use store::RefundStore;
