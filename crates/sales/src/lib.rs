//! Orders domain module.
//!
//! This crate contains the purchase rules checked before an order is
//! settled, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage). The settlement itself (order insert plus threshold-guarded
//! stock decrement) lives in the infra layer.

pub mod order;

pub use order::{Order, PlaceOrder};
