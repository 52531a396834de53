//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value, json};
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Error raised by a marketplace service.
    Workflow(WorkflowError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, context) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, Map::new()),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg, Map::new())
            }
            ApiError::Workflow(err) => workflow_error_to_response(err),
        };

        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message));
        body.insert("code".to_string(), Value::String(code.to_string()));
        body.extend(context);
        (status, axum::Json(Value::Object(body))).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, &'static str, String, Map<String, Value>) {
    let message = err.to_string();
    let (status, code, context) = match &err {
        WorkflowError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", json!({})),
        WorkflowError::EmptyCart => (StatusCode::BAD_REQUEST, "empty_cart", json!({})),
        WorkflowError::UnknownActor(_) => (StatusCode::UNAUTHORIZED, "unauthorized", json!({})),
        WorkflowError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", json!({})),
        WorkflowError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "not_found",
            json!({ "entity": entity, "id": id }),
        ),
        WorkflowError::OutOfStock {
            product_id,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            "out_of_stock",
            json!({
                "product_id": product_id,
                "requested": requested,
                "available": available,
            }),
        ),
        WorkflowError::InsufficientStock(product_id) => (
            StatusCode::CONFLICT,
            "insufficient_stock",
            json!({ "product_id": product_id }),
        ),
        WorkflowError::InvalidTransition(_) => {
            (StatusCode::CONFLICT, "invalid_transition", json!({}))
        }
        WorkflowError::Conflict(_) => (StatusCode::CONFLICT, "conflict", json!({})),
        WorkflowError::ProductHasOrderHistory(product_id) => (
            StatusCode::CONFLICT,
            "product_has_order_history",
            json!({ "product_id": product_id }),
        ),
        WorkflowError::PaymentAuthorizationFailed { order_id, .. } => (
            StatusCode::BAD_GATEWAY,
            "payment_authorization_failed",
            json!({ "order_id": order_id }),
        ),
        WorkflowError::Store(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error".to_string(),
                Map::new(),
            );
        }
    };

    let context = match context {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    (status, code, message, context)
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}
