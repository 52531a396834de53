//! Applying payment confirmation events to orders.

use chrono::Utc;
use common::OrderId;
use domain::{OrderStatuses, PaymentEvent, reconcile};
use serde::Serialize;
use store::MarketStore;

use crate::error::{Result, WorkflowError};

/// Compare-and-set attempts before giving up on a contended order.
const MAX_ATTEMPTS: usize = 3;

/// What applying a payment event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The order's statuses changed.
    Applied {
        order_id: OrderId,
        statuses: OrderStatuses,
    },
    /// The event had already been applied, or cannot change the order any more.
    Unchanged { order_id: OrderId },
    /// No order carries this payment intent. Stale or foreign events land here.
    UnknownIntent,
}

impl ReconcileOutcome {
    fn label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied { .. } => "applied",
            ReconcileOutcome::Unchanged { .. } => "unchanged",
            ReconcileOutcome::UnknownIntent => "unknown_intent",
        }
    }
}

/// Applies payment events keyed by payment intent.
///
/// Applying the same event any number of times leaves the order as a single
/// application would.
pub struct PaymentReconciler<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> PaymentReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(kind = %event.kind, payment_intent_id = %event.payment_intent_id))]
    pub async fn apply(&self, event: &PaymentEvent) -> Result<ReconcileOutcome> {
        let outcome = self.apply_with_retry(event).await?;
        metrics::counter!(
            "payment_events_total",
            "outcome" => event.kind.as_str(),
            "applied" => outcome.label()
        )
        .increment(1);
        tracing::info!(result = outcome.label(), "payment event processed");
        Ok(outcome)
    }

    async fn apply_with_retry(&self, event: &PaymentEvent) -> Result<ReconcileOutcome> {
        for attempt in 1..=MAX_ATTEMPTS {
            let Some(order) = self
                .store
                .find_order_by_payment_intent(&event.payment_intent_id)
                .await?
            else {
                return Ok(ReconcileOutcome::UnknownIntent);
            };

            let current = order.statuses();
            let Some(next) = reconcile(current, event.kind) else {
                return Ok(ReconcileOutcome::Unchanged { order_id: order.id });
            };

            if self
                .store
                .update_order_statuses(order.id, current, next, Utc::now())
                .await?
            {
                return Ok(ReconcileOutcome::Applied {
                    order_id: order.id,
                    statuses: next,
                });
            }
            tracing::debug!(attempt, order_id = %order.id, "order changed underneath, retrying");
        }

        Err(WorkflowError::Conflict(format!(
            "order for payment intent {} kept changing",
            event.payment_intent_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_intent_is_ignored() {
        let reconciler = PaymentReconciler::new(store::InMemoryStore::new());
        let outcome = reconciler
            .apply(&PaymentEvent::succeeded("pi_missing"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::UnknownIntent);
    }

    #[test]
    fn test_outcome_labels() {
        let order_id = OrderId::new();
        assert_eq!(ReconcileOutcome::UnknownIntent.label(), "unknown_intent");
        assert_eq!(ReconcileOutcome::Unchanged { order_id }.label(), "unchanged");
    }
}
