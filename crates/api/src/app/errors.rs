use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use chargeforge_catalog::CatalogError;
use chargeforge_core::DomainError;
use chargeforge_orders::{OrderError, ValidationError};
use chargeforge_stock::StockError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn validation_error_to_response(err: ValidationError) -> axum::response::Response {
    match err {
        ValidationError::EmptyAccountId => {
            json_error(StatusCode::BAD_REQUEST, "empty_account_id", err.to_string())
        }
        ValidationError::ZoneRequired => {
            json_error(StatusCode::BAD_REQUEST, "zone_required", err.to_string())
        }
        ValidationError::AccountNotFound => {
            json_error(StatusCode::NOT_FOUND, "account_not_found", err.to_string())
        }
        ValidationError::ProviderUnavailable => {
            json_error(StatusCode::BAD_GATEWAY, "provider_unavailable", err.to_string())
        }
    }
}

pub fn stock_error_to_response(err: StockError) -> axum::response::Response {
    match err {
        StockError::NotFound => json_error(StatusCode::NOT_FOUND, "unknown_product", "unknown product"),
        StockError::InvalidArgument(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", msg)
        }
        StockError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::ServiceUnavailable => json_error(
            StatusCode::BAD_GATEWAY,
            "provider_unavailable",
            "provider service unavailable",
        ),
        CatalogError::UnknownProduct => {
            json_error(StatusCode::NOT_FOUND, "unknown_product", "unknown product")
        }
    }
}

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    match err {
        OrderError::NotFound => json_error(StatusCode::NOT_FOUND, "order_not_found", "order not found"),
        OrderError::Validation(inner) => validation_error_to_response(inner),
        OrderError::PackageUnavailable(msg) => {
            json_error(StatusCode::CONFLICT, "package_unavailable", msg)
        }
        OrderError::InsufficientStock => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", "insufficient stock")
        }
        OrderError::ProviderUnavailable => json_error(
            StatusCode::BAD_GATEWAY,
            "provider_unavailable",
            "provider unavailable",
        ),
        OrderError::ProviderRejected { note } => {
            json_error(StatusCode::BAD_GATEWAY, "provider_rejected", note)
        }
        OrderError::Domain(inner) => domain_error_to_response(inner),
    }
}
