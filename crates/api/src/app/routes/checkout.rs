use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use chargeforge_core::{AccountRef, GameCode, OrderId, ProductId};
use chargeforge_orders::OrderStore;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/checkout/validate", post(validate_account))
        .route("/checkout/services", get(list_services))
        .route("/checkout/orders", post(create_order))
        .route("/checkout/orders/:id", get(get_order))
        .route("/checkout/orders/:id/validate", post(validate_order_account))
        .route("/checkout/orders/:id/select", post(select_package))
        .route("/checkout/orders/:id/submit", post(submit_order))
        .route("/checkout/orders/:id/cancel-poll", post(cancel_poll))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

/// Standalone account check, usable before any order exists.
pub async fn validate_account(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ValidateAccountRequest>,
) -> axum::response::Response {
    let game = match GameCode::new(body.game) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .validator()
        .validate(&game, &body.account_id, body.zone_id.as_deref())
        .await
    {
        Ok(display_name) => (
            StatusCode::OK,
            Json(serde_json::json!({ "display_name": display_name })),
        )
            .into_response(),
        Err(e) => errors::validation_error_to_response(e),
    }
}

pub async fn list_services(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ServicesQuery>,
) -> axum::response::Response {
    let game = match GameCode::new(query.game) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.catalog().list_available(&game).await {
        Ok(list) => {
            let services_json: Vec<serde_json::Value> = list.iter().map(dto::service_to_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "services": services_json })),
            )
                .into_response()
        }
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let game = match GameCode::new(body.game) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let account = match AccountRef::new(body.account_id, body.zone_id) {
        Ok(a) => a,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coordinator().begin(account, game) {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().orders().get(&order_id) {
        Some(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "order_not_found", "order not found"),
    }
}

pub async fn validate_order_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().validate_account(&order_id).await {
        Ok(validated) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "display_name": validated.display_name,
                "order": dto::order_to_json(&validated.order),
            })),
        )
            .into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn select_package(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::SelectPackageRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    match services
        .coordinator()
        .select_package(&order_id, &product_id, body.amount.unwrap_or(1))
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn submit_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.coordinator().submit(&order_id).await {
        Ok(order) => {
            // Drive the order to a terminal state in the background; the
            // client follows along via GET.
            services.spawn_poll(&order);
            (StatusCode::ACCEPTED, Json(dto::order_to_json(&order))).into_response()
        }
        Err(e) => errors::order_error_to_response(e),
    }
}

/// Stop the live polling task for an order. The order itself is untouched;
/// the reconciliation worker picks it up later.
pub async fn cancel_poll(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cancelled = services.cancel_poll(&order_id);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "cancelled": cancelled })),
    )
        .into_response()
}
