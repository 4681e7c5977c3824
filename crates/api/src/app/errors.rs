use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use validator::ValidationErrors;

use bazaar_core::DomainError;
use bazaar_infra::ServiceError;

const INTERNAL_MESSAGE: &str = "something wrong with the server. Please contact admin";
const CONFLICT_MESSAGE: &str = "the product changed while processing the request, please try again";

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let status = status_of(&err);
    match &err {
        ServiceError::Persistence(detail) => {
            tracing::error!(error = %detail, "persistence failure");
            json_error(status, err.code(), INTERNAL_MESSAGE)
        }
        ServiceError::Concurrency(detail) => {
            tracing::warn!(error = %detail, "concurrent modification");
            json_error(status, err.code(), CONFLICT_MESSAGE)
        }
        ServiceError::Domain(_) => json_error(status, err.code(), err.to_string()),
    }
}

pub fn status_of(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Domain(e) => match e {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::Validation(_)
            | DomainError::QueryConstruction(_)
            | DomainError::InvalidId(_)
            | DomainError::IncompatibleBankAccount
            | DomainError::SelfPurchaseForbidden
            | DomainError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        },
        ServiceError::Concurrency(_) => StatusCode::CONFLICT,
        ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    service_error_to_response(err.into())
}

/// Flatten derive-validator output into `field: message;` pairs.
pub fn validation_errors_to_response(errors: ValidationErrors) -> axum::response::Response {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg};"),
                None => format!("{field}: {};", e.code),
            })
        })
        .collect();
    parts.sort();
    json_error(StatusCode::BAD_REQUEST, "validation_error", parts.join(" "))
}

pub fn body_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "query_construction_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "message": message.into(),
            "code": code,
        })),
    )
        .into_response()
}
