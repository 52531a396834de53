//! Payment provider webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::PaymentEvent;
use store::MarketStore;
use workflow::ReconcileOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /webhooks/payments
///
/// Origin verification happens in front of the API. Every well-formed event
/// is acknowledged with 200, including unknown and replayed intents, so the
/// provider stops redelivering.
#[tracing::instrument(skip(state, event), fields(payment_intent_id = %event.payment_intent_id))]
pub async fn receive<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<ReconcileOutcome>, ApiError> {
    if event.payment_intent_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "payment_intent_id must not be empty".to_string(),
        ));
    }
    Ok(Json(state.reconciler.apply(&event).await?))
}
