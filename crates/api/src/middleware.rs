use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use bazaar_auth::JwtValidator;

use crate::app::errors::json_error;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Reject the request unless it carries a valid bearer token.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?.ok_or_else(unauthenticated)?;
    let caller = authenticate(&state, token)?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Attach the caller when a bearer token is sent; anonymous requests pass.
///
/// A token that is present but invalid is still rejected.
pub async fn optional_auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    if let Some(token) = extract_bearer(req.headers())? {
        let caller = authenticate(&state, token)?;
        req.extensions_mut().insert(caller);
    }
    Ok(next.run(req).await)
}

fn authenticate(state: &AuthState, token: &str) -> Result<CallerContext, Response> {
    let identity = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
        unauthenticated()
    })?;
    Ok(CallerContext::new(identity))
}

/// `Ok(None)` when no Authorization header is sent at all.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, Response> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| unauthenticated())?;

    let header = header.strip_prefix("Bearer ").ok_or_else(unauthenticated)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(unauthenticated());
    }

    Ok(Some(token))
}

fn unauthenticated() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing or invalid bearer token")
}
