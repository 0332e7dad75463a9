use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use chargeforge_catalog::Product;
use chargeforge_core::{GameCode, ProductId, ServiceCode};
use chargeforge_orders::{OrderStatus, OrderStore};
use chargeforge_provider::ProviderApi;
use chargeforge_stock::{AdjustmentType, StockRecord};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/stock", get(list_stock).put(set_stock))
        .route("/stock/history", get(stock_history))
        .route("/vip-sync", post(vip_sync))
        .route("/products", post(create_product))
        .route("/provider/balance", get(provider_balance))
        .route("/orders", get(list_orders))
}

fn require_admin(actor: &ActorContext) -> Result<(), axum::response::Response> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "admin role required",
        ))
    }
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    let rows: Vec<serde_json::Value> = services
        .registry()
        .list()
        .iter()
        .filter_map(|product| {
            let record = services.ledger().peek(&product.id).ok()?;
            Some(dto::stock_row_to_json(product, &record))
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "stock": rows }))).into_response()
}

pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::SetStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    let product_id: ProductId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    let current = match services.ledger().peek(&product_id) {
        Ok(record) => record,
        Err(e) => return errors::stock_error_to_response(e),
    };

    let adjustment = match services.ledger().adjust(
        product_id,
        body.stock - current.quantity,
        AdjustmentType::ManualAdjustment,
        Some(body.reason),
        Some(actor.actor_id()),
    ) {
        Ok(a) => a,
        Err(e) => return errors::stock_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "product_id": product_id.to_string(),
            "quantity": adjustment.record.quantity,
            "entry": adjustment.entry.as_ref().map(dto::history_to_json),
        })),
    )
        .into_response()
}

pub async fn stock_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    let limit = query.limit.unwrap_or(50).min(500);
    let entries: Vec<serde_json::Value> = services
        .ledger()
        .history(None, limit)
        .iter()
        .map(dto::history_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "history": entries }))).into_response()
}

pub async fn vip_sync(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::VipSyncRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    if body.action != "sync-stock" {
        return errors::json_error(StatusCode::BAD_REQUEST, "unknown_action", "unsupported action");
    }

    let mut synced = 0usize;
    let mut updated = 0usize;
    let mut failed = 0usize;

    for product in services.registry().list() {
        let level = match services.provider().check_stock(&product.service_code).await {
            Ok(level) => level,
            Err(err) => {
                tracing::warn!(product_id = %product.id, error = %err, "stock sync read failed");
                failed += 1;
                continue;
            }
        };

        match services.ledger().reconcile_from_sync(product.id, level.stock) {
            Ok(adjustment) => {
                synced += 1;
                if adjustment.entry.is_some() {
                    updated += 1;
                }
            }
            Err(err) => {
                tracing::warn!(product_id = %product.id, error = %err, "stock sync apply failed");
                failed += 1;
            }
        }
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "synced": synced,
            "updated": updated,
            "failed": failed,
        })),
    )
        .into_response()
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    let game = match GameCode::new(body.game) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let service_code = match ServiceCode::new(body.service_code) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let product = match Product::new(ProductId::new(), body.name, game, service_code) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let record = match body.stock_type.as_deref() {
        Some("unlimited") => StockRecord::unlimited(product.id),
        Some("limited") | None => StockRecord::limited(product.id, body.stock.unwrap_or(0)),
        Some(other) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_stock_type",
                format!("unknown stock type: {other}"),
            )
        }
    }
    .with_thresholds(body.min_stock, body.max_stock);

    if let Err(e) = services.registry().insert(product.clone()) {
        return errors::domain_error_to_response(e);
    }
    let record = match services.ledger().onboard(record) {
        Ok(r) => r,
        Err(e) => return errors::stock_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(dto::stock_row_to_json(&product, &record)),
    )
        .into_response()
}

pub async fn provider_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    match services.provider().balance().await {
        Ok(balance) => {
            (StatusCode::OK, Json(serde_json::json!({ "balance": balance }))).into_response()
        }
        Err(err) => errors::json_error(StatusCode::BAD_GATEWAY, "provider_unavailable", err.to_string()),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(query): Query<dto::OrdersQuery>,
) -> axum::response::Response {
    if let Err(resp) = require_admin(&actor) {
        return resp;
    }

    let status: OrderStatus = match serde_json::from_value(serde_json::Value::String(query.status.clone()))
    {
        Ok(s) => s,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", "unknown order status")
        }
    };

    let orders: Vec<serde_json::Value> = services
        .coordinator()
        .orders()
        .list_by_status(status)
        .iter()
        .map(dto::order_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "orders": orders }))).into_response()
}
