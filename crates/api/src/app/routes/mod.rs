use axum::Router;

pub mod checkout;
pub mod stock;
pub mod system;

/// All domain routes (actor context required).
pub fn router() -> Router {
    Router::new().merge(stock::router()).merge(checkout::router())
}
