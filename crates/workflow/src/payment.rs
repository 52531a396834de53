//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::Money;

use crate::error::PaymentGatewayError;

/// A payment intent created by the provider for one authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAuthorization {
    pub payment_intent_id: String,
}

/// The external charge-authorization service.
///
/// Authorization only creates an intent; the final outcome arrives later as
/// a payment event.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(
        &self,
        order_id: OrderId,
        buyer_id: UserId,
        amount: Money,
    ) -> Result<PaymentAuthorization, PaymentGatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, (OrderId, UserId, Money)>,
    next_id: u32,
    fail_on_authorize: bool,
    delay: Option<Duration>,
}

/// In-memory payment gateway that issues sequential intent ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following authorization fail with a decline.
    pub fn set_fail_on_authorize(&self, fail: bool) {
        self.lock().fail_on_authorize = fail;
    }

    /// Delays every following authorization, to simulate a slow provider.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Returns the number of intents issued.
    pub fn intent_count(&self) -> usize {
        self.lock().intents.len()
    }

    /// Returns the order an intent was issued for.
    pub fn order_for_intent(&self, payment_intent_id: &str) -> Option<OrderId> {
        self.lock()
            .intents
            .get(payment_intent_id)
            .map(|(order_id, _, _)| *order_id)
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryGatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize(
        &self,
        order_id: OrderId,
        buyer_id: UserId,
        amount: Money,
    ) -> Result<PaymentAuthorization, PaymentGatewayError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail_on_authorize {
            return Err(PaymentGatewayError::Declined("card declined".to_string()));
        }

        state.next_id += 1;
        let payment_intent_id = format!("pi_{:04}", state.next_id);
        state
            .intents
            .insert(payment_intent_id.clone(), (order_id, buyer_id, amount));

        Ok(PaymentAuthorization { payment_intent_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authorize_issues_intent() {
        let gateway = InMemoryPaymentGateway::new();
        let order_id = OrderId::new();

        let result = gateway
            .authorize(order_id, UserId::new(), Money::from_cents(2500))
            .await
            .unwrap();
        assert!(result.payment_intent_id.starts_with("pi_"));
        assert_eq!(gateway.intent_count(), 1);
        assert_eq!(gateway.order_for_intent(&result.payment_intent_id), Some(order_id));
    }

    #[tokio::test]
    async fn test_fail_on_authorize() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_authorize(true);

        let result = gateway
            .authorize(OrderId::new(), UserId::new(), Money::from_cents(100))
            .await;
        assert!(matches!(result, Err(PaymentGatewayError::Declined(_))));
        assert_eq!(gateway.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_intent_ids() {
        let gateway = InMemoryPaymentGateway::new();
        let order_id = OrderId::new();
        let buyer_id = UserId::new();
        let amount = Money::from_cents(1000);

        let r1 = gateway.authorize(order_id, buyer_id, amount).await.unwrap();
        let r2 = gateway.authorize(order_id, buyer_id, amount).await.unwrap();

        assert_eq!(r1.payment_intent_id, "pi_0001");
        assert_eq!(r2.payment_intent_id, "pi_0002");
    }
}
