//! Caller identity extraction.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the auth layer in front of the API.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf the request is made.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;
        let id = raw
            .trim()
            .parse()
            .map_err(|_| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER} header")))?;
        Ok(Actor(id))
    }
}
