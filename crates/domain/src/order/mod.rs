//! Orders: status machine, checkout snapshot and payment reconciliation.

mod model;
mod payment;
mod placement;
mod status;

pub use model::{Order, OrderDetails, OrderItem};
pub use payment::{PaymentEvent, PaymentEventKind, reconcile};
pub use placement::OrderPlacement;
pub use status::{OrderStatus, OrderStatuses, PaymentStatus};
