use serde::Deserialize;

use chargeforge_catalog::{Product, Service};
use chargeforge_orders::{Order, OrderStatus};
use chargeforge_stock::{StockHistoryEntry, StockRecord};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub game: String,
    pub service_code: String,
    /// "limited" (default) or "unlimited".
    pub stock_type: Option<String>,
    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub product_id: String,
    pub stock: i64,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct VipSyncRequest {
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateAccountRequest {
    pub game: String,
    pub account_id: String,
    pub zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub game: String,
    pub account_id: String,
    pub zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectPackageRequest {
    pub product_id: String,
    /// Package units; defaults to one.
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    pub game: String,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: String,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn stock_row_to_json(product: &Product, record: &StockRecord) -> serde_json::Value {
    serde_json::json!({
        "product_id": product.id.to_string(),
        "name": product.name,
        "game": product.game.as_str(),
        "service_code": product.service_code.as_str(),
        "stock_type": record.stock_type,
        "quantity": record.quantity,
        "min_stock": record.min_stock,
        "max_stock": record.max_stock,
        "low_stock": record.is_low(),
        "last_synced_at": record.last_synced_at.map(|t| t.to_rfc3339()),
    })
}

pub fn history_to_json(entry: &StockHistoryEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id.to_string(),
        "product_id": entry.product_id.to_string(),
        "type": entry.entry_type,
        "quantity_delta": entry.quantity_delta,
        "previous_stock": entry.previous_stock,
        "new_stock": entry.new_stock,
        "reason": entry.reason,
        "actor_id": entry.actor_id.map(|a| a.to_string()),
        "created_at": entry.created_at.to_rfc3339(),
    })
}

pub fn service_to_json(service: &Service) -> serde_json::Value {
    serde_json::json!({
        "code": service.code.as_str(),
        "display_name": service.display_name,
        "price": { "basic": service.price.basic, "premium": service.price.premium },
        "status": service.status,
    })
}

fn status_label(status: OrderStatus) -> String {
    match serde_json::to_value(status) {
        Ok(serde_json::Value::String(s)) => s,
        _ => format!("{status:?}").to_lowercase(),
    }
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id.to_string(),
        "game": order.game.as_str(),
        "account": {
            "external_id": order.account.external_id,
            "zone_id": order.account.zone_id,
        },
        "product_id": order.product_id.map(|p| p.to_string()),
        "service_code": order.service_code.as_ref().map(|c| c.as_str().to_string()),
        "amount_requested": order.amount_requested,
        "status": order.status,
        // Soft timeouts must read as in-progress, never as failure.
        "display_status": if order.status == OrderStatus::Polling {
            "still processing".to_string()
        } else {
            status_label(order.status)
        },
        "provider_transaction_id": order.provider_transaction_id,
        "note": order.note,
        "created_at": order.created_at.to_rfc3339(),
        "updated_at": order.updated_at.to_rfc3339(),
    })
}
