//! Domain layer for the marketplace.
//!
//! This crate holds the entity types and the business rules that do not
//! need I/O:
//! - `Money` for exact decimal amounts
//! - users and roles, catalog products, cart rows
//! - the order status machine and the checkout snapshot (`OrderPlacement`)
//! - the payment reconciliation rule
//! - reviews and messages

pub mod cart;
pub mod catalog;
pub mod error;
pub mod message;
pub mod money;
pub mod order;
pub mod review;
pub mod user;

pub use cart::{CartItem, CartLine, CartView, QuantityChange};
pub use catalog::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use error::DomainError;
pub use message::{Message, NewMessage};
pub use money::Money;
pub use order::{
    Order, OrderDetails, OrderItem, OrderPlacement, OrderStatus, OrderStatuses, PaymentEvent,
    PaymentEventKind, PaymentStatus, reconcile,
};
pub use review::{NewReview, Review};
pub use user::{NewUser, Role, User};
