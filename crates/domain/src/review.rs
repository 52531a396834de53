//! Product reviews.

use chrono::{DateTime, Utc};
use common::{ProductId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn into_review(
        self,
        product_id: ProductId,
        buyer_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Review, DomainError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(DomainError::validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        let comment = self.comment.trim().to_string();
        if comment.is_empty() {
            return Err(DomainError::validation("comment must not be empty"));
        }

        Ok(Review {
            id: ReviewId::new(),
            product_id,
            buyer_id,
            rating: self.rating,
            comment,
            created_at: now,
        })
    }
}
