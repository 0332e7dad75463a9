//! Storage seam for stock records and their audit log.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chargeforge_core::ProductId;

use crate::history::StockHistoryEntry;
use crate::record::StockRecord;

/// Persistence seam for the ledger. The relational layout is two
/// tables/collections: `stock_records` (materialized) and `stock_history`
/// (append-only). The ledger provides per-product serialization above this
/// trait, so implementations only need plain reads/writes.
pub trait StockStore: Send + Sync {
    fn get(&self, product_id: &ProductId) -> Option<StockRecord>;
    fn upsert(&self, record: StockRecord);
    fn list(&self) -> Vec<StockRecord>;
    fn append_history(&self, entry: StockHistoryEntry);
    /// Recent entries, newest first, optionally scoped to one product.
    fn history(&self, product_id: Option<&ProductId>, limit: usize) -> Vec<StockHistoryEntry>;
    /// Full log for one product, oldest first (replay order).
    fn history_for_replay(&self, product_id: &ProductId) -> Vec<StockHistoryEntry>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn get(&self, product_id: &ProductId) -> Option<StockRecord> {
        (**self).get(product_id)
    }

    fn upsert(&self, record: StockRecord) {
        (**self).upsert(record)
    }

    fn list(&self) -> Vec<StockRecord> {
        (**self).list()
    }

    fn append_history(&self, entry: StockHistoryEntry) {
        (**self).append_history(entry)
    }

    fn history(&self, product_id: Option<&ProductId>, limit: usize) -> Vec<StockHistoryEntry> {
        (**self).history(product_id, limit)
    }

    fn history_for_replay(&self, product_id: &ProductId) -> Vec<StockHistoryEntry> {
        (**self).history_for_replay(product_id)
    }
}

/// In-memory store for dev/test. History is kept in insertion order, which
/// is also creation order because all appends happen inside the ledger's
/// per-product critical section.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    records: RwLock<HashMap<ProductId, StockRecord>>,
    history: RwLock<Vec<StockHistoryEntry>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, product_id: &ProductId) -> Option<StockRecord> {
        let map = self.records.read().ok()?;
        map.get(product_id).cloned()
    }

    fn upsert(&self, record: StockRecord) {
        if let Ok(mut map) = self.records.write() {
            map.insert(record.product_id, record);
        }
    }

    fn list(&self) -> Vec<StockRecord> {
        let map = match self.records.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut records: Vec<_> = map.values().cloned().collect();
        records.sort_by_key(|r| *r.product_id.as_uuid());
        records
    }

    fn append_history(&self, entry: StockHistoryEntry) {
        if let Ok(mut log) = self.history.write() {
            log.push(entry);
        }
    }

    fn history(&self, product_id: Option<&ProductId>, limit: usize) -> Vec<StockHistoryEntry> {
        let log = match self.history.read() {
            Ok(l) => l,
            Err(_) => return vec![],
        };
        log.iter()
            .rev()
            .filter(|e| product_id.is_none_or(|p| e.product_id == *p))
            .take(limit)
            .cloned()
            .collect()
    }

    fn history_for_replay(&self, product_id: &ProductId) -> Vec<StockHistoryEntry> {
        let log = match self.history.read() {
            Ok(l) => l,
            Err(_) => return vec![],
        };
        log.iter()
            .filter(|e| e.product_id == *product_id)
            .cloned()
            .collect()
    }
}
