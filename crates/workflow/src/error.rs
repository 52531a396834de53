//! Workflow error types.

use common::{OrderId, ProductId, UserId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the marketplace services.
///
/// Every variant except `Store` is a business outcome the caller can act on.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A cart mutation asked for more than the product has available.
    #[error("Product {product_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A checkout line could not be covered by current stock.
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    #[error("Cart is empty")]
    EmptyCart,

    /// The order was committed but no payment intent could be obtained.
    /// It stays pending and the payment can be retried.
    #[error("Payment authorization failed for order {order_id}: {reason}")]
    PaymentAuthorizationFailed { order_id: OrderId, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order's current status does not allow the requested change.
    #[error("{0}")]
    InvalidTransition(String),

    /// A concurrent change won the race, or a unique value is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The acting user id does not belong to any account.
    #[error("Unknown user {0}")]
    UnknownActor(UserId),

    /// The acting user may not perform this operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Product {0} has order history and cannot be deleted")]
    ProductHasOrderHistory(ProductId),

    /// Storage failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        WorkflowError::Forbidden(message.into())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientStock(product_id) => {
                WorkflowError::InsufficientStock(product_id)
            }
            DomainError::EmptyCart => WorkflowError::EmptyCart,
            DomainError::InvalidTransition { .. } => WorkflowError::InvalidTransition(err.to_string()),
            DomainError::Validation(_)
            | DomainError::InvalidQuantity { .. }
            | DomainError::InvalidPrice { .. }
            | DomainError::AmountOverflow => WorkflowError::Validation(err.to_string()),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock(product_id) => {
                WorkflowError::InsufficientStock(product_id)
            }
            StoreError::OutOfStock {
                product_id,
                requested,
                available,
            } => WorkflowError::OutOfStock {
                product_id,
                requested,
                available,
            },
            StoreError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            StoreError::Duplicate(what) => WorkflowError::Conflict(format!("{what} already in use")),
            StoreError::ProductHasOrderHistory(product_id) => {
                WorkflowError::ProductHasOrderHistory(product_id)
            }
            StoreError::Conflict(reason) => WorkflowError::Conflict(reason),
            other => WorkflowError::Store(other),
        }
    }
}

/// Errors reported by a payment gateway.
#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("Payment declined: {0}")]
    Declined(String),

    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for workflow results.
pub type Result<T> = std::result::Result<T, WorkflowError>;
