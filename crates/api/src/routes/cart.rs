//! Cart endpoints. Every mutation answers with the updated cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::CartView;
use serde::Deserialize;
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    /// Zero or negative removes the row.
    pub quantity: i64,
}

/// GET /cart
pub async fn view<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.view_cart(actor).await?))
}

/// POST /cart/items
#[tracing::instrument(skip(state, req), fields(product_id = %req.product_id))]
pub async fn add_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    state.cart.add_item(actor, req.product_id, req.quantity).await?;
    Ok(Json(state.cart.view_cart(actor).await?))
}

/// PUT /cart/items/{product_id}
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    state
        .cart
        .update_quantity(actor, product_id, req.quantity)
        .await?;
    Ok(Json(state.cart.view_cart(actor).await?))
}

/// DELETE /cart/items/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let product_id: ProductId = parse_id(&product_id, "product id")?;
    state.cart.remove_item(actor, product_id).await?;
    Ok(Json(state.cart.view_cart(actor).await?))
}

/// DELETE /cart
pub async fn clear<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<StatusCode, ApiError> {
    state.cart.clear_cart(actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
