use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A checkout line could not be reserved: the product no longer has enough
    /// sellable units. The whole transaction was rolled back.
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// A cart row would exceed what the product can sell. Nothing was written.
    #[error("Product {product_id} has {available} units available, requested {requested}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A unique constraint was violated (duplicate email, username, intent id).
    #[error("Duplicate {0}")]
    Duplicate(String),

    /// The product is referenced by order items and cannot be deleted.
    #[error("Product {0} has order history")]
    ProductHasOrderHistory(ProductId),

    /// A concurrent transaction interfered (serialization failure or deadlock).
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
