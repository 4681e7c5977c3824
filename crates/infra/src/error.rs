//! Service-level error combining domain and gateway failures.

use thiserror::Error;

use bazaar_core::DomainError;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic business failure (validation, ownership, stock rules, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A guarded or single-row write matched no row: the record was deleted or
    /// changed underneath the operation. Carries gateway detail; not for
    /// callers.
    #[error("concurrent modification: {0}")]
    Concurrency(StoreError),

    /// The store failed. Not safe to show to callers verbatim.
    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::RowCount { .. } => ServiceError::Concurrency(value),
            StoreError::Backend { .. } => ServiceError::Persistence(value),
        }
    }
}

impl ServiceError {
    /// Stable machine-readable code for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => match e {
                DomainError::Validation(_) | DomainError::InvalidId(_) => "validation_error",
                DomainError::QueryConstruction(_) => "query_construction_error",
                DomainError::NotFound(_) => "not_found",
                DomainError::Forbidden(_) => "forbidden",
                DomainError::IncompatibleBankAccount => "incompatible_bank_account",
                DomainError::SelfPurchaseForbidden => "self_purchase_forbidden",
                DomainError::InsufficientStock { .. } => "insufficient_stock",
            },
            ServiceError::Concurrency(_) => "concurrency_error",
            ServiceError::Persistence(_) => "persistence_error",
        }
    }
}
