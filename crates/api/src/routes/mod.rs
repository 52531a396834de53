pub mod cart;
pub mod messages;
pub mod ops;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a path segment into a typed id.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}: {raw}")))
}
