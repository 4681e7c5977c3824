use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use validator::Validate;

use bazaar_core::BankAccountId;
use bazaar_products::BankAccountView;

use crate::app::dto::{self, Envelope};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;
use crate::middleware::{self, AuthState};

/// Every bank account route requires an authenticated caller.
pub fn router(auth: AuthState) -> Router {
    Router::new()
        .route("/", get(list_bank_accounts).post(create_bank_account))
        .route("/:id", patch(update_bank_account).delete(delete_bank_account))
        .route_layer(axum::middleware::from_fn_with_state(auth, middleware::auth_middleware))
}

fn parse_account_id(raw: &str) -> Result<BankAccountId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

pub async fn create_bank_account(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    body: Result<Json<dto::BankAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services.bank_accounts.create(caller.identity(), body.into()).await {
        Ok(account) => (StatusCode::OK, Json(Envelope::data("success", BankAccountView::from(&account)))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_bank_accounts(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.bank_accounts.list(caller.user_id()).await {
        Ok(accounts) => {
            let items = accounts.iter().map(BankAccountView::from).collect::<Vec<_>>();
            (StatusCode::OK, Json(Envelope::data("success", items))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_bank_account(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::BankAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let account_id = match parse_account_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };
    if let Err(e) = body.validate() {
        return errors::validation_errors_to_response(e);
    }

    match services
        .bank_accounts
        .update(account_id, caller.user_id(), body.into())
        .await
    {
        Ok(account) => (StatusCode::OK, Json(Envelope::data("success", BankAccountView::from(&account)))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_bank_account(
    Extension(services): Extension<AppServices>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let account_id = match parse_account_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.bank_accounts.delete(account_id, caller.user_id()).await {
        Ok(()) => (StatusCode::OK, Json(Envelope::message("success"))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
