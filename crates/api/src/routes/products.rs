//! Catalog and review endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{NewProduct, NewReview, Product, ProductFilter, ProductUpdate, Review};
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

/// GET /products — active listings, filtered by `category` and `seller_id`.
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products(&filter).await?))
}

/// POST /products — sellers only.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(actor, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/{id}
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.catalog.get_product(id).await?))
}

/// PUT /products/{id} — owning seller or admin.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.catalog.update_product(actor, id, req).await?))
}

/// DELETE /products/{id} — owning seller or admin; refused once ordered.
#[tracing::instrument(skip(state))]
pub async fn delete<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    state.catalog.delete_product(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/{id}/reviews
pub async fn list_reviews<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.reviews.list_reviews(id).await?))
}

/// POST /products/{id}/reviews — buyers only.
#[tracing::instrument(skip(state, req))]
pub async fn create_review<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let id: ProductId = parse_id(&id, "product id")?;
    let review = state.reviews.create_review(actor, id, req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}
