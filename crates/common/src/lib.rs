//! Shared identifier types for the marketplace crates.

pub mod ids;

pub use ids::{MessageId, OrderId, OrderItemId, ProductId, ReviewId, UserId};
