//! Products domain module (catalog).
//!
//! This crate contains business rules for product listings, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage):
//! - `product`: listing records, drafts and tri-state patches
//! - `tags`: tag reconciliation (minimal insert/delete sets)
//! - `query`: normalized catalog filters, sort and pagination
//! - `view`: read-facing product and detail views

pub mod product;
pub mod query;
pub mod tags;
pub mod view;

pub use product::{Condition, Patch, Product, ProductDraft, ProductPatch, ProductTag};
pub use query::{CatalogQuery, ListProductsRequest, SortDirection, SortField};
pub use tags::{TagDiff, reconcile};
pub use view::{BankAccountView, ProductDetailView, ProductView, SellerView, tag_texts};
