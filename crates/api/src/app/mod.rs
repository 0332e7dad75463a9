//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: service graph (provider, ledger, catalog, coordinator,
//!   poller, reconcile worker)
//! - `routes/`: HTTP routes + handlers (admin stock surface, checkout flow)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app() -> Router {
    let services = services::build_services().await;
    build_app_with(services)
}

/// Build the router over an existing service graph (tests wire their own).
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    // Domain routes require an actor context.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::actor_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
