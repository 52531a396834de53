//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use store::MarketStore;
use workflow::{
    AccountService, CartService, CatalogService, InMemoryPaymentGateway, MessageService,
    OrderWorkflow, PaymentReconciler, ReviewService,
};

/// Services shared by every handler.
pub struct AppState<S: MarketStore + Clone> {
    pub accounts: AccountService<S>,
    pub catalog: CatalogService<S>,
    pub cart: CartService<S>,
    pub orders: OrderWorkflow<S, InMemoryPaymentGateway>,
    pub reconciler: PaymentReconciler<S>,
    pub reviews: ReviewService<S>,
    pub messages: MessageService<S>,
}

/// Creates the application state over `store` with the in-memory payment gateway.
pub fn create_default_state<S: MarketStore + Clone + 'static>(
    store: S,
    payment: InMemoryPaymentGateway,
    payment_timeout: Duration,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        accounts: AccountService::new(store.clone()),
        catalog: CatalogService::new(store.clone()),
        cart: CartService::new(store.clone()),
        orders: OrderWorkflow::new(store.clone(), payment).with_payment_timeout(payment_timeout),
        reconciler: PaymentReconciler::new(store.clone()),
        reviews: ReviewService::new(store.clone()),
        messages: MessageService::new(store),
    })
}
