//! Checkout and the order lifecycle.

use std::time::{Duration, Instant};

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{Order, OrderDetails, OrderPlacement, OrderStatus, PaymentStatus, Role, User};
use store::MarketStore;

use crate::access::{load_actor, load_with_role};
use crate::error::{Result, WorkflowError};
use crate::payment::PaymentGateway;

/// Default upper bound on one payment authorization call.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns carts into orders and drives order status changes.
///
/// Checkout commits the order, its items, the stock decrements and the cart
/// clear as one store transaction, then asks the payment gateway for an
/// intent. Status changes are compare-and-set against the statuses read, so
/// of two concurrent changes at most one applies.
pub struct OrderWorkflow<S: MarketStore, P: PaymentGateway> {
    store: S,
    payment: P,
    payment_timeout: Duration,
}

impl<S: MarketStore, P: PaymentGateway> OrderWorkflow<S, P> {
    pub fn new(store: S, payment: P) -> Self {
        Self {
            store,
            payment,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }

    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    /// Places an order from the buyer's cart.
    ///
    /// On `PaymentAuthorizationFailed` the order exists and stays
    /// pending/pending; the buyer can call [`retry_payment`](Self::retry_payment).
    #[tracing::instrument(skip(self), fields(order_id))]
    pub async fn checkout(&self, actor_id: UserId) -> Result<OrderDetails> {
        metrics::counter!("checkout_total").increment(1);
        let start = Instant::now();

        let result = self.place_order(actor_id).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        if let Err(ref err) = result {
            metrics::counter!("checkout_failures_total", "reason" => failure_reason(err))
                .increment(1);
            tracing::warn!(error = %err, "checkout failed");
        }
        result
    }

    async fn place_order(&self, actor_id: UserId) -> Result<OrderDetails> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "check out").await?;

        let cart = self.store.list_cart(buyer.id).await?;
        let placement = OrderPlacement::from_cart(buyer.id, &cart, Utc::now())?;
        tracing::Span::current().record("order_id", tracing::field::display(placement.order.id));

        self.store.commit_checkout(&placement).await?;
        tracing::info!(
            total = %placement.order.total_amount,
            items = placement.items.len(),
            "order placed"
        );

        let mut details = placement.into_details();
        let payment_intent_id = self.request_authorization(&details.order).await?;
        details.order = self.record_intent(details.order, payment_intent_id).await?;
        Ok(details)
    }

    /// Requests a new payment intent for a pending order whose payment failed
    /// or never received an intent. Events for a replaced failed intent are
    /// ignored from then on.
    #[tracing::instrument(skip(self))]
    pub async fn retry_payment(&self, actor_id: UserId, order_id: OrderId) -> Result<Order> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "pay for orders").await?;
        let order = self.load_order(order_id).await?.order;
        if !order.is_owned_by(buyer.id) {
            return Err(WorkflowError::forbidden("order belongs to another buyer"));
        }
        if !order.can_retry_payment() {
            let reason = match order.payment_intent_id {
                Some(ref intent) if order.payment_status == PaymentStatus::Pending => {
                    format!("payment {intent} is still awaiting confirmation")
                }
                _ => format!(
                    "cannot retry payment for a {} order with {} payment",
                    order.order_status, order.payment_status
                ),
            };
            return Err(WorkflowError::InvalidTransition(reason));
        }

        let payment_intent_id = self.request_authorization(&order).await?;
        self.record_intent(order, payment_intent_id).await
    }

    /// Moves an order along `pending → processing → shipped → delivered`.
    /// Cancelling goes through [`cancel`](Self::cancel) so stock is restored.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        actor_id: UserId,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        if target == OrderStatus::Cancelled {
            return self.cancel(actor_id, order_id).await;
        }

        let actor = load_actor(&self.store, actor_id).await?;
        let details = self.load_order(order_id).await?;
        if !self.is_staff_for(&actor, &details).await? {
            return Err(WorkflowError::forbidden(
                "only an admin or a seller in the order may change its status",
            ));
        }

        let mut order = details.order;
        let expected = order.statuses();
        let next = expected.with_order_status(order.order_status.transition_to(target)?);
        let now = Utc::now();
        if !self
            .store
            .update_order_statuses(order_id, expected, next, now)
            .await?
        {
            return Err(WorkflowError::Conflict(
                "order was modified concurrently".to_string(),
            ));
        }

        metrics::counter!("order_transitions_total", "to" => target.as_str()).increment(1);
        tracing::info!(from = %order.order_status, to = %target, "order status changed");
        order.order_status = next.order_status;
        order.updated_at = now;
        Ok(order)
    }

    /// Cancels an order and returns its items to stock.
    ///
    /// Buyers may cancel their own pending orders. Admins and sellers in the
    /// order may cancel pending or processing orders.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, actor_id: UserId, order_id: OrderId) -> Result<Order> {
        let actor = load_actor(&self.store, actor_id).await?;
        let details = self.load_order(order_id).await?;

        let is_staff = self.is_staff_for(&actor, &details).await?;
        if !is_staff && !details.order.is_owned_by(actor.id) {
            return Err(WorkflowError::forbidden("order belongs to another buyer"));
        }
        let mut order = details.order;
        if !is_staff && order.order_status != OrderStatus::Pending {
            return Err(WorkflowError::InvalidTransition(format!(
                "buyers can only cancel pending orders, this one is {}",
                order.order_status
            )));
        }

        let expected = order.statuses();
        let next =
            expected.with_order_status(order.order_status.transition_to(OrderStatus::Cancelled)?);
        let now = Utc::now();
        if !self.store.cancel_order(order_id, expected, next, now).await? {
            return Err(WorkflowError::Conflict(
                "order was modified concurrently".to_string(),
            ));
        }

        metrics::counter!("order_transitions_total", "to" => OrderStatus::Cancelled.as_str())
            .increment(1);
        tracing::info!(from = %order.order_status, "order cancelled");
        order.order_status = next.order_status;
        order.updated_at = now;
        Ok(order)
    }

    /// Orders visible to the actor, newest first.
    pub async fn list_orders(&self, actor_id: UserId) -> Result<Vec<Order>> {
        let actor = load_actor(&self.store, actor_id).await?;
        let orders = match actor.role {
            Role::Buyer => self.store.list_orders_for_buyer(actor.id).await?,
            Role::Seller => self.store.list_orders_for_seller(actor.id).await?,
            Role::Admin => self.store.list_all_orders().await?,
        };
        Ok(orders)
    }

    /// Loads an order with its items if the actor may see it.
    pub async fn get_order(&self, actor_id: UserId, order_id: OrderId) -> Result<OrderDetails> {
        let actor = load_actor(&self.store, actor_id).await?;
        let details = self.load_order(order_id).await?;
        if details.order.is_owned_by(actor.id) || self.is_staff_for(&actor, &details).await? {
            return Ok(details);
        }
        Err(WorkflowError::forbidden("order is not visible to this user"))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<OrderDetails> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("order", order_id))
    }

    /// Admins, and sellers owning at least one product in the order.
    async fn is_staff_for(&self, actor: &User, details: &OrderDetails) -> Result<bool> {
        match actor.role {
            Role::Admin => Ok(true),
            Role::Buyer => Ok(false),
            Role::Seller => {
                for item in &details.items {
                    if let Some(product) = self.store.get_product(item.product_id).await?
                        && product.is_owned_by(actor.id)
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Asks the gateway for a payment intent, bounded by the configured timeout.
    async fn request_authorization(&self, order: &Order) -> Result<String> {
        let call = self
            .payment
            .authorize(order.id, order.buyer_id, order.total_amount);

        let reason = match tokio::time::timeout(self.payment_timeout, call).await {
            Ok(Ok(authorization)) => return Ok(authorization.payment_intent_id),
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!(
                "payment provider did not answer within {} ms",
                self.payment_timeout.as_millis()
            ),
        };

        tracing::warn!(order_id = %order.id, %reason, "payment authorization failed");
        Err(WorkflowError::PaymentAuthorizationFailed {
            order_id: order.id,
            reason,
        })
    }

    /// Stores a new intent on a pending order and resets its payment to pending.
    async fn record_intent(&self, mut order: Order, payment_intent_id: String) -> Result<Order> {
        let now = Utc::now();
        let attached = self
            .store
            .attach_payment_intent(order.id, order.statuses(), &payment_intent_id, now)
            .await?;
        if !attached {
            return Err(WorkflowError::Conflict(
                "order changed before its payment intent was recorded".to_string(),
            ));
        }

        tracing::info!(order_id = %order.id, %payment_intent_id, "payment intent attached");
        order.payment_intent_id = Some(payment_intent_id);
        order.payment_status = PaymentStatus::Pending;
        order.updated_at = now;
        Ok(order)
    }
}

/// Metric label for a failed checkout.
fn failure_reason(err: &WorkflowError) -> &'static str {
    match err {
        WorkflowError::EmptyCart => "empty_cart",
        WorkflowError::InsufficientStock(_) => "insufficient_stock",
        WorkflowError::PaymentAuthorizationFailed { .. } => "payment_authorization",
        WorkflowError::Conflict(_) => "conflict",
        WorkflowError::Forbidden(_) | WorkflowError::UnknownActor(_) => "forbidden",
        _ => "other",
    }
}
