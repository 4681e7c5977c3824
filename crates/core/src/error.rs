//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// ownership, stock rules). Storage failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input). The message carries
    /// field-level detail.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A catalog filter could not be turned into a query.
    #[error("invalid catalog query: {0}")]
    QueryConstruction(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced record is absent or soft-deleted.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller does not own the record it tried to mutate.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The bank account does not belong to the product's seller.
    #[error("bank account does not belong to the product's seller")]
    IncompatibleBankAccount,

    /// A seller tried to buy their own product.
    #[error("cannot buy your own product")]
    SelfPurchaseForbidden,

    /// Requested quantity exceeds available stock.
    #[error("insufficient stock (requested: {requested}, available: {available})")]
    InsufficientStock { requested: i64, available: i64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryConstruction(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound(what)
    }
}
