//! HTTP API server for the marketplace.
//!
//! Provides REST endpoints for accounts, catalog, carts, checkout, order
//! management and the payment webhook, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::MarketStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, create_default_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{cart, messages, ops, orders, payments, products, users};

    let metrics_router = Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(ops::health))
        .route("/users", post(users::register::<S>).get(users::list::<S>))
        .route("/users/{id}", get(users::get::<S>))
        .route("/users/{id}/role", put(users::change_role::<S>))
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/products/{id}/reviews",
            get(products::list_reviews::<S>).post(products::create_review::<S>),
        )
        .route("/cart", get(cart::view::<S>).delete(cart::clear::<S>))
        .route("/cart/items", post(cart::add_item::<S>))
        .route(
            "/cart/items/{product_id}",
            put(cart::update_item::<S>).delete(cart::remove_item::<S>),
        )
        .route("/checkout", post(orders::checkout::<S>))
        .route("/orders", get(orders::list::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/orders/{id}/status", post(orders::transition::<S>))
        .route("/orders/{id}/cancel", post(orders::cancel::<S>))
        .route("/orders/{id}/payment", post(orders::retry_payment::<S>))
        .route("/webhooks/payments", post(payments::receive::<S>))
        .route("/messages", post(messages::send::<S>))
        .route("/messages/{user_id}", get(messages::conversation::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
