//! Catalog management.

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{NewProduct, Product, ProductFilter, ProductUpdate, Role, User};
use store::MarketStore;

use crate::access::{load_actor, load_with_role};
use crate::error::{Result, WorkflowError};

/// Creates and maintains product listings.
pub struct CatalogService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(&self, actor_id: UserId, input: NewProduct) -> Result<Product> {
        let seller = load_with_role(&self.store, actor_id, Role::Seller, "list products").await?;
        let product = input.into_product(seller.id, Utc::now())?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, "product listed");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("product", id))
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        Ok(self.store.list_products(filter).await?)
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        actor_id: UserId,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product> {
        let actor = load_actor(&self.store, actor_id).await?;
        let product = self.get_product(id).await?;
        ensure_can_manage(&actor, &product)?;

        let update = update.validate()?;
        self.store
            .update_product(id, &update, Utc::now())
            .await?
            .ok_or_else(|| WorkflowError::not_found("product", id))
    }

    /// Deletes a listing that was never ordered. Listings with order history
    /// must be delisted through `active` instead.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, actor_id: UserId, id: ProductId) -> Result<()> {
        let actor = load_actor(&self.store, actor_id).await?;
        let product = self.get_product(id).await?;
        ensure_can_manage(&actor, &product)?;

        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

fn ensure_can_manage(actor: &User, product: &Product) -> Result<()> {
    if actor.is_admin() || (actor.role == Role::Seller && product.is_owned_by(actor.id)) {
        return Ok(());
    }
    Err(WorkflowError::forbidden(
        "only the owning seller or an admin may change this product",
    ))
}
