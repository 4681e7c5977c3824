use axum::Router;

use crate::middleware::AuthState;

pub mod bank_accounts;
pub mod products;
pub mod system;

/// Router for the versioned API. Each resource router decides per method
/// whether the caller must be authenticated.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .nest("/product", products::router(auth.clone()))
        .nest("/bank/account", bank_accounts::router(auth))
}
