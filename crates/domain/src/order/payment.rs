//! Payment confirmation events and the reconciliation rule.

use serde::{Deserialize, Serialize};

use super::{OrderStatus, OrderStatuses, PaymentStatus};

/// Outcome reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentEventKind {
    Succeeded,
    Failed,
}

impl PaymentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventKind::Succeeded => "succeeded",
            PaymentEventKind::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payment confirmation, already verified by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub kind: PaymentEventKind,
    pub payment_intent_id: String,
}

impl PaymentEvent {
    pub fn succeeded(payment_intent_id: impl Into<String>) -> Self {
        Self {
            kind: PaymentEventKind::Succeeded,
            payment_intent_id: payment_intent_id.into(),
        }
    }

    pub fn failed(payment_intent_id: impl Into<String>) -> Self {
        Self {
            kind: PaymentEventKind::Failed,
            payment_intent_id: payment_intent_id.into(),
        }
    }
}

/// Computes the statuses after applying `kind`, or `None` if nothing changes.
///
/// A success marks the payment paid and moves a pending order to
/// processing. A failure marks a pending payment failed and leaves the
/// order pending. `Paid` is final. Applying the same event to its own
/// result is always `None`, so replays are no-ops.
pub fn reconcile(current: OrderStatuses, kind: PaymentEventKind) -> Option<OrderStatuses> {
    let next = match (kind, current.payment_status) {
        (_, PaymentStatus::Paid) => return None,
        (PaymentEventKind::Succeeded, _) => {
            let order_status = if current.order_status == OrderStatus::Pending {
                OrderStatus::Processing
            } else {
                current.order_status
            };
            OrderStatuses::new(order_status, PaymentStatus::Paid)
        }
        (PaymentEventKind::Failed, PaymentStatus::Failed) => return None,
        (PaymentEventKind::Failed, PaymentStatus::Pending) => {
            current.with_payment_status(PaymentStatus::Failed)
        }
    };
    Some(next)
}
