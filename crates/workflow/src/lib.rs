//! Marketplace services.
//!
//! Each service wraps a [`store::MarketStore`] and enforces the caller's
//! role before touching it. `OrderWorkflow` owns checkout:
//! 1. Validate the buyer's cart against current stock and snapshot prices
//! 2. Commit order, items, stock decrements and cart clear in one transaction
//! 3. Request a payment intent from the gateway, bounded by a timeout
//!
//! `PaymentReconciler` later applies the provider's confirmation events.

mod access;
pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod messages;
pub mod orders;
pub mod payment;
pub mod reconciliation;
pub mod reviews;

pub use accounts::AccountService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use error::{PaymentGatewayError, Result, WorkflowError};
pub use messages::MessageService;
pub use orders::{DEFAULT_PAYMENT_TIMEOUT, OrderWorkflow};
pub use payment::{InMemoryPaymentGateway, PaymentAuthorization, PaymentGateway};
pub use reconciliation::{PaymentReconciler, ReconcileOutcome};
pub use reviews::ReviewService;
