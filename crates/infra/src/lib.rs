//! Infrastructure layer: persistence gateway, application services, config.
//!
//! - `store`: the gateway traits every backend implements
//! - `in_memory` / `postgres`: the two backends
//! - `product_service`, `order_service`, `catalog_reader`,
//!   `bank_account_service`: use cases over a `CatalogStore`

pub mod bank_account_service;
pub mod catalog_reader;
pub mod config;
pub mod error;
pub mod in_memory;
pub mod order_service;
pub mod postgres;
pub mod product_service;
pub mod store;

pub use bank_account_service::BankAccounts;
pub use catalog_reader::{CatalogReader, Page, PageMeta};
pub use config::{AppConfig, ConfigError};
pub use error::{ServiceError, ServiceResult};
#[cfg(any(test, feature = "test-util"))]
pub use in_memory::FailPoint;
pub use in_memory::InMemoryCatalogStore;
pub use order_service::OrderSettlement;
pub use postgres::PostgresCatalogStore;
pub use product_service::{CreatedProduct, ProductLifecycle, UpdatedProduct};
pub use store::{CatalogStore, CatalogTx, StoreError};
