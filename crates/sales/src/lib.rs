pub mod error;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod postgres;
pub mod saga;
pub mod status;
pub mod store;

pub use error::{Result, SalesError};
pub use memory::InMemorySaleStore;
pub use models::{CartItem, CreateSale, Sale, SaleLine, SaleRecord};
pub use orchestrator::SaleOrchestrator;
pub use postgres::PostgresSaleStore;
pub use status::SaleStatus;
pub use store::SaleStore;
