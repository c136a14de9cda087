pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use common::{ProductId, StoreId};
pub use error::{Result, StockError};
pub use ledger::{Availability, BulkUpdateOutcome, StockLedger, StockOp, StockUpdate};
pub use memory::InMemoryStockLedger;
pub use postgres::PostgresStockLedger;
