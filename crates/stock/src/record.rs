//! Materialized stock state, one row per purchasable product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chargeforge_core::ProductId;

/// How a product's local quantity is interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockType {
    Limited,
    Unlimited,
    OutOfStock,
}

/// Current locally exposed purchasable quantity for one product.
///
/// This row is a materialized view; the history log is authoritative
/// (see [`crate::history`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub stock_type: StockType,
    /// Meaningful only for [`StockType::Limited`]; never negative.
    pub quantity: i64,
    /// Low-stock signaling threshold. Not a hard cap on writes.
    pub min_stock: Option<i64>,
    /// High-water signaling threshold. Not a hard cap on writes.
    pub max_stock: Option<i64>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl StockRecord {
    pub fn limited(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            stock_type: StockType::Limited,
            quantity: quantity.max(0),
            min_stock: None,
            max_stock: None,
            last_synced_at: None,
        }
    }

    pub fn unlimited(product_id: ProductId) -> Self {
        Self {
            product_id,
            stock_type: StockType::Unlimited,
            quantity: 0,
            min_stock: None,
            max_stock: None,
            last_synced_at: None,
        }
    }

    pub fn with_thresholds(mut self, min_stock: Option<i64>, max_stock: Option<i64>) -> Self {
        self.min_stock = min_stock;
        self.max_stock = max_stock;
        self
    }

    /// Whether this product can currently be sold locally.
    /// Readers ignore `quantity` for unlimited records.
    pub fn sellable(&self) -> bool {
        match self.stock_type {
            StockType::Unlimited => true,
            StockType::Limited => self.quantity > 0,
            StockType::OutOfStock => false,
        }
    }

    /// Low-stock signal for the admin surface.
    pub fn is_low(&self) -> bool {
        self.stock_type == StockType::Limited
            && self.min_stock.is_some_and(|min| self.quantity <= min)
    }
}
