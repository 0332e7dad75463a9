//! Append-only audit log of stock mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chargeforge_core::{ActorId, ProductId};

/// Why a stock quantity changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentType {
    ManualAdjustment,
    OrderReduction,
    SyncUpdate,
    Restore,
}

/// One immutable audit record per applied stock mutation.
///
/// `quantity_delta` is the *applied* change (after clamping), so
/// `new_stock = previous_stock + quantity_delta` always holds and replaying
/// the log reproduces the materialized quantity exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub id: Uuid,
    pub product_id: ProductId,
    pub entry_type: AdjustmentType,
    pub quantity_delta: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Free text; required for manual adjustments.
    pub reason: Option<String>,
    /// None for system-originated entries.
    pub actor_id: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

/// Fold a product's history (oldest first) back into its current quantity.
///
/// Returns `None` for an empty log. This is the reconciliation ground truth:
/// the result must equal the materialized `StockRecord::quantity`.
pub fn replay(entries: &[StockHistoryEntry]) -> Option<i64> {
    let first = entries.first()?;
    Some(
        entries
            .iter()
            .fold(first.previous_stock, |acc, e| acc + e.quantity_delta),
    )
}
