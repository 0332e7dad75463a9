use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::context::{ActorContext, ActorRole};

/// Derive the actor context from the headers set by the upstream auth
/// collaborator (`x-actor-id`, `x-actor-role`). Requests without a valid
/// actor id are refused.
pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let context = extract_actor(req.headers())?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn extract_actor(headers: &HeaderMap) -> Result<ActorContext, StatusCode> {
    let actor_id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let actor_id = actor_id.parse().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let role = match headers.get("x-actor-role").and_then(|v| v.to_str().ok()) {
        Some("admin") => ActorRole::Admin,
        _ => ActorRole::Customer,
    };

    Ok(ActorContext::new(actor_id, role))
}
