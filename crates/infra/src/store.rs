//! Persistence gateway boundary for the catalog.
//!
//! Two call shapes, kept apart on purpose:
//!
//! - `CatalogStore` methods run standalone, each in its own implicit
//!   statement scope.
//! - `CatalogTx` methods run inside a transaction obtained from
//!   `CatalogStore::begin`, which must end in `commit` or `rollback`.
//!   Dropping an unfinished transaction discards its writes.
//!
//! Absent and soft-deleted records are reported as `Ok(None)`; single-row
//! writes that hit zero (or several) rows are reported as
//! `StoreError::RowCount` so callers can surface a concurrency failure.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_core::{BankAccountId, ProductId, UserId};
use bazaar_parties::{BankAccount, UserProfile};
use bazaar_products::{CatalogQuery, Product, ProductTag};
use bazaar_sales::Order;

/// Gateway error.
///
/// These are infrastructure errors as opposed to domain errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write that must touch exactly one row touched a different number.
    #[error("{operation}: expected exactly 1 affected row, got {affected}")]
    RowCount { operation: &'static str, affected: u64 },

    /// The backing store failed (connection, constraint, decode, ...).
    #[error("{operation}: {message}")]
    Backend { operation: &'static str, message: String },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    /// Turn an affected-row count into `Ok` only when it is exactly one.
    pub fn expect_one(operation: &'static str, affected: u64) -> Result<(), StoreError> {
        if affected == 1 {
            Ok(())
        } else {
            Err(Self::RowCount { operation, affected })
        }
    }
}

/// Standalone catalog reads and writes, plus transaction entry.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Open a transaction. Hold it only for the duration of one operation.
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Tag rows for several products at once, grouped by product and sorted by
    /// tag text. Products without tags are absent from the map.
    async fn tags_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Vec<ProductTag>>, StoreError>;

    /// One page of non-deleted products matching `query`, plus the total
    /// number of matches ignoring pagination.
    async fn list_products(&self, query: &CatalogQuery) -> Result<(Vec<Product>, i64), StoreError>;

    /// Sum of ordered quantities per product. Products never ordered are absent.
    async fn purchase_counts(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, StoreError>;

    /// Sum of ordered quantities across every product the seller lists.
    async fn units_sold_by(&self, seller: UserId) -> Result<i64, StoreError>;

    /// Single-statement stock overwrite outside any transaction.
    async fn update_stock(&self, id: ProductId, stock: i64) -> Result<(), StoreError>;

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    async fn profile_by_id(&self, id: UserId) -> Result<Option<UserProfile>, StoreError>;

    async fn bank_account_by_id(&self, id: BankAccountId) -> Result<Option<BankAccount>, StoreError>;

    /// Non-deleted accounts of `owner`, newest first.
    async fn bank_accounts_of(&self, owner: UserId) -> Result<Vec<BankAccount>, StoreError>;

    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError>;

    async fn update_bank_account(&self, account: &BankAccount) -> Result<(), StoreError>;

    async fn soft_delete_bank_account(&self, id: BankAccountId) -> Result<(), StoreError>;
}

/// Writes (and the reads they depend on) inside one transaction.
#[async_trait]
pub trait CatalogTx: Send {
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Callers skip this when `tags` is empty.
    async fn insert_tags(&mut self, product_id: ProductId, tags: &[String]) -> Result<(), StoreError>;

    /// Current tag rows of one product, as seen by this transaction.
    async fn tags_of(&mut self, product_id: ProductId) -> Result<Vec<ProductTag>, StoreError>;

    /// Callers skip this when `ids` is empty.
    async fn delete_tags(&mut self, ids: &[i64]) -> Result<(), StoreError>;

    async fn delete_tags_of(&mut self, product_id: ProductId) -> Result<(), StoreError>;

    /// Overwrite descriptive fields and purchasability. Never touches stock.
    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn soft_delete_product(&mut self, id: ProductId) -> Result<(), StoreError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Subtract `quantity` from the stored stock, relative to whatever the row
    /// holds at write time. Matches no row (`RowCount`) when the remaining
    /// stock no longer covers `quantity`. Returns the stock left.
    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<i64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
