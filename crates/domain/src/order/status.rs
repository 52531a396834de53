//! Order and payment status state machines.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The fulfilment status of an order.
///
/// State transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► Delivered
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created by checkout, awaiting payment confirmation.
    #[default]
    Pending,

    /// Paid (or manually accepted), being prepared.
    Processing,

    /// Handed to the carrier.
    Shipped,

    /// Received by the buyer (terminal state).
    Delivered,

    /// Cancelled before shipping (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Processing, OrderStatus::Cancelled)
        )
    }

    /// Returns `next` if the transition is legal.
    pub fn transition_to(&self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                current: *self,
                action: next.action(),
            })
        }
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    fn action(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "reopen",
            OrderStatus::Processing => "start processing",
            OrderStatus::Shipped => "ship",
            OrderStatus::Delivered => "deliver",
            OrderStatus::Cancelled => "cancel",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// The payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Authorization requested (or not yet requested), no confirmation received.
    #[default]
    Pending,
    /// The provider confirmed the payment. Final.
    Paid,
    /// The provider reported a failure; the buyer may retry.
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

/// The pair of status fields that change after checkout.
///
/// Stores update both columns with compare-and-set on this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct OrderStatuses {
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl OrderStatuses {
    pub fn new(order_status: OrderStatus, payment_status: PaymentStatus) -> Self {
        Self {
            order_status,
            payment_status,
        }
    }

    /// Returns a copy with a different order status.
    pub fn with_order_status(self, order_status: OrderStatus) -> Self {
        Self {
            order_status,
            ..self
        }
    }

    /// Returns a copy with a different payment status.
    pub fn with_payment_status(self, payment_status: PaymentStatus) -> Self {
        Self {
            payment_status,
            ..self
        }
    }
}
