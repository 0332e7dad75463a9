//! `chargeforge-stock` — the authoritative local stock ledger.
//!
//! The append-only history log is the ground truth; `StockRecord` rows are a
//! materialized view over it. All mutations flow through
//! [`StockLedger::adjust`], which serializes per product.

pub mod history;
pub mod ledger;
pub mod record;
pub mod store;

pub use history::{replay, AdjustmentType, StockHistoryEntry};
pub use ledger::{Adjustment, StockError, StockLedger};
pub use record::{StockRecord, StockType};
pub use store::{InMemoryStockStore, StockStore};
