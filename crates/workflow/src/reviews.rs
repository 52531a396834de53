//! Product reviews.

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{NewReview, Review, Role};
use store::MarketStore;

use crate::access::load_with_role;
use crate::error::{Result, WorkflowError};

pub struct ReviewService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_review(
        &self,
        actor_id: UserId,
        product_id: ProductId,
        input: NewReview,
    ) -> Result<Review> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "review products").await?;
        if self.store.get_product(product_id).await?.is_none() {
            return Err(WorkflowError::not_found("product", product_id));
        }
        let review = input.into_review(product_id, buyer.id, Utc::now())?;
        self.store.insert_review(&review).await?;
        Ok(review)
    }

    /// Reviews of a product, newest first.
    pub async fn list_reviews(&self, product_id: ProductId) -> Result<Vec<Review>> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(WorkflowError::not_found("product", product_id));
        }
        Ok(self.store.list_reviews(product_id).await?)
    }
}
