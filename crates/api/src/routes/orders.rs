//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{Order, OrderDetails, OrderStatus};
use serde::Deserialize;
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

/// POST /checkout — turns the caller's cart into a pending order.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<(StatusCode, Json<OrderDetails>), ApiError> {
    let details = state.orders.checkout(actor).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// GET /orders — orders visible to the caller, newest first.
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders(actor).await?))
}

/// GET /orders/{id}
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.get_order(actor, id).await?))
}

/// POST /orders/{id}/status
#[tracing::instrument(skip(state, req), fields(status = %req.status))]
pub async fn transition<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.transition(actor, id, req.status).await?))
}

/// POST /orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.cancel(actor, id).await?))
}

/// POST /orders/{id}/payment — request a new payment intent.
#[tracing::instrument(skip(state))]
pub async fn retry_payment<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.retry_payment(actor, id).await?))
}
