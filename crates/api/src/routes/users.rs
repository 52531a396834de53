//! Account endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{NewUser, Role, User};
use serde::Deserialize;
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// POST /users — register a buyer or seller.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users — admin only.
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.accounts.list_users(actor).await?))
}

/// GET /users/{id}
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id: UserId = parse_id(&id, "user id")?;
    Ok(Json(state.accounts.get_user(id).await?))
}

/// PUT /users/{id}/role — admin only.
#[tracing::instrument(skip(state, req))]
pub async fn change_role<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(id): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let id: UserId = parse_id(&id, "user id")?;
    Ok(Json(state.accounts.change_role(actor, id, req.role).await?))
}
