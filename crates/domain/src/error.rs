//! Domain error types.

use common::ProductId;
use thiserror::Error;

use crate::order::OrderStatus;

/// Business-rule violations detected by the pure domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Malformed input (bad email, empty title, out-of-range rating, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i64 },

    /// Price must be positive with at most two decimal places.
    #[error("Invalid price: {price}")]
    InvalidPrice { price: String },

    /// A checkout line exceeds the product's availability at checkout time.
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// Checkout was attempted with no cart rows.
    #[error("Cart is empty")]
    EmptyCart,

    /// The order is not in a state that allows the requested transition.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Monetary arithmetic overflowed.
    #[error("Amount overflow")]
    AmountOverflow,
}

impl DomainError {
    /// Shorthand for a [`DomainError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}
