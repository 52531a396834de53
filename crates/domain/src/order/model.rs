//! Placed orders and their immutable line snapshots.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::{OrderStatus, OrderStatuses, PaymentStatus};
use crate::error::DomainError;
use crate::money::Money;

/// An order placed by checkout.
///
/// Everything except the status fields and the payment-intent reference is
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub total_amount: Money,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns both status fields.
    pub fn statuses(&self) -> OrderStatuses {
        OrderStatuses::new(self.order_status, self.payment_status)
    }

    pub fn is_owned_by(&self, buyer: UserId) -> bool {
        self.buyer_id == buyer
    }

    /// Returns true if a new payment authorization may replace the current one.
    ///
    /// A pending payment with a live intent may still be confirmed by the
    /// provider, so only a failed payment or one that never got an intent
    /// (declined or timed out authorization) can be retried.
    pub fn can_retry_payment(&self) -> bool {
        if self.order_status != OrderStatus::Pending {
            return false;
        }
        match self.payment_status {
            PaymentStatus::Failed => true,
            PaymentStatus::Pending => self.payment_intent_id.is_none(),
            PaymentStatus::Paid => false,
        }
    }
}

/// A product's price and quantity as they were at the moment of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Returns `quantity × unit_price`.
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// An order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetails {
    /// Sums the line totals of every item.
    pub fn items_total(&self) -> Result<Money, DomainError> {
        let totals = self
            .items
            .iter()
            .map(OrderItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Money::sum(totals)
    }

    /// Returns true if the stored total equals the sum of the line snapshots.
    pub fn is_consistent(&self) -> bool {
        self.items_total()
            .is_ok_and(|total| total == self.order.total_amount)
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(
        order_status: OrderStatus,
        payment_status: PaymentStatus,
        intent: Option<&str>,
    ) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            buyer_id: UserId::new(),
            total_amount: Money::from_cents(1000),
            order_status,
            payment_status,
            payment_intent_id: intent.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_retry_needs_failed_or_missing_intent() {
        use OrderStatus::{Cancelled, Pending, Processing};

        let intent = Some("pi_0001");
        assert!(order(Pending, PaymentStatus::Pending, None).can_retry_payment());
        assert!(order(Pending, PaymentStatus::Failed, intent).can_retry_payment());
        assert!(!order(Pending, PaymentStatus::Pending, intent).can_retry_payment());
        assert!(!order(Processing, PaymentStatus::Paid, intent).can_retry_payment());
        assert!(!order(Cancelled, PaymentStatus::Failed, intent).can_retry_payment());
    }
}
