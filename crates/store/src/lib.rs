//! Persistence for the marketplace.
//!
//! [`MarketStore`] is the transaction boundary of the system: every stock
//! decrement and order status change goes through it. [`InMemoryStore`]
//! serializes all calls behind one lock; [`PostgresStore`] relies on row
//! locks and conditional updates inside a transaction.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::MarketStore;
