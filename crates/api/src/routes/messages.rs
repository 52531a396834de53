//! Direct message endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{Message, NewMessage};
use store::MarketStore;

use super::parse_id;
use crate::error::ApiError;
use crate::extract::Actor;
use crate::state::AppState;

/// POST /messages
#[tracing::instrument(skip(state, req))]
pub async fn send<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Json(req): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state.messages.send_message(actor, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /messages/{user_id} — conversation between the caller and `user_id`.
pub async fn conversation<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Actor(actor): Actor,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let other: UserId = parse_id(&user_id, "user id")?;
    Ok(Json(state.messages.conversation(actor, other).await?))
}
