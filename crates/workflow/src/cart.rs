//! Buyer carts.

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{CartItem, CartView, DomainError, QuantityChange, Role};
use store::MarketStore;

use crate::access::load_with_role;
use crate::error::{Result, WorkflowError};

/// Maintains each buyer's cart rows against current catalog availability.
///
/// The store checks availability in the same transaction as each mutation,
/// but nothing is reserved; checkout re-checks inside its own transaction.
pub struct CartService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the buyer's cart with line totals and subtotal at current prices.
    pub async fn view_cart(&self, actor_id: UserId) -> Result<CartView> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "use a cart").await?;
        let entries = self.store.list_cart(buyer.id).await?;
        Ok(CartView::build(buyer.id, entries)?)
    }

    /// Adds `quantity` units, incrementing an existing row.
    ///
    /// The resulting row quantity must not exceed the product's availability.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        actor_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 }.into());
        }
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "use a cart").await?;
        let item = CartItem {
            buyer_id: buyer.id,
            product_id,
            quantity,
            added_at: Utc::now(),
        };
        Ok(self.store.add_cart_item(&item).await?)
    }

    /// Sets a row's quantity. Zero or negative removes the row.
    ///
    /// Returns the updated row, or `None` if it was removed.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        actor_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Option<CartItem>> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "use a cart").await?;

        match QuantityChange::from_requested(quantity)? {
            QuantityChange::Remove => {
                self.store.delete_cart_item(buyer.id, product_id).await?;
                Ok(None)
            }
            QuantityChange::Set(quantity) => {
                let row = self
                    .store
                    .set_cart_quantity(buyer.id, product_id, quantity)
                    .await?
                    .ok_or_else(|| WorkflowError::not_found("cart item", product_id))?;
                Ok(Some(row))
            }
        }
    }

    pub async fn remove_item(&self, actor_id: UserId, product_id: ProductId) -> Result<()> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "use a cart").await?;
        if !self.store.delete_cart_item(buyer.id, product_id).await? {
            return Err(WorkflowError::not_found("cart item", product_id));
        }
        Ok(())
    }

    /// Empties the cart. Returns the number of rows removed.
    pub async fn clear_cart(&self, actor_id: UserId) -> Result<u64> {
        let buyer = load_with_role(&self.store, actor_id, Role::Buyer, "use a cart").await?;
        Ok(self.store.clear_cart(buyer.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, NewProduct, NewUser, Product, User};
    use store::InMemoryStore;

    async fn seed_user(store: &InMemoryStore, name: &str, role: Role) -> User {
        let user = NewUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            name: name.to_string(),
            role,
        }
        .into_user(Utc::now())
        .unwrap();
        store.insert_user(&user).await.unwrap();
        user
    }

    async fn seed_product(store: &InMemoryStore, seller: UserId, price: &str, qty: u32) -> Product {
        let product = NewProduct {
            title: "Mug".to_string(),
            description: String::new(),
            price: Money::parse(price).unwrap(),
            quantity_available: qty,
            images: vec![],
            category: "kitchen".to_string(),
        }
        .into_product(seller, Utc::now())
        .unwrap();
        store.insert_product(&product).await.unwrap();
        product
    }

    async fn setup() -> (CartService<InMemoryStore>, User, Product) {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller", Role::Seller).await;
        let buyer = seed_user(&store, "buyer", Role::Buyer).await;
        let product = seed_product(&store, seller.id, "4.00", 3).await;
        (CartService::new(store), buyer, product)
    }

    #[tokio::test]
    async fn test_add_increments_existing_row() {
        let (service, buyer, product) = setup().await;
        service.add_item(buyer.id, product.id, 1).await.unwrap();
        let item = service.add_item(buyer.id, product.id, 2).await.unwrap();
        assert_eq!(item.quantity, 3);

        let cart = service.view_cart(buyer.id).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.subtotal, Money::parse("12.00").unwrap());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_out_of_stock() {
        let (service, buyer, product) = setup().await;
        service.add_item(buyer.id, product.id, 2).await.unwrap();

        let err = service.add_item(buyer.id, product.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::OutOfStock {
                requested: 4,
                available: 3,
                ..
            }
        ));
        let cart = service.view_cart(buyer.id).await.unwrap();
        assert_eq!(cart.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_zero_quantity_update_removes_row() {
        let (service, buyer, product) = setup().await;
        service.add_item(buyer.id, product.id, 2).await.unwrap();

        let row = service.update_quantity(buyer.id, product.id, 0).await.unwrap();
        assert!(row.is_none());
        assert!(service.view_cart(buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let (service, buyer, product) = setup().await;
        let err = service
            .update_quantity(buyer.id, product.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_revalidates_stock() {
        let (service, buyer, product) = setup().await;
        service.add_item(buyer.id, product.id, 1).await.unwrap();
        let err = service
            .update_quantity(buyer.id, product.id, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::OutOfStock { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_both_increments() {
        let (service, buyer, product) = setup().await;
        let (first, second) = tokio::join!(
            service.add_item(buyer.id, product.id, 1),
            service.add_item(buyer.id, product.id, 2),
        );
        first.unwrap();
        second.unwrap();

        let cart = service.view_cart(buyer.id).await.unwrap();
        assert_eq!(cart.total_quantity(), 3);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (service, buyer, _) = setup().await;
        let err = service
            .add_item(buyer.id, ProductId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn test_sellers_have_no_cart() {
        let store = InMemoryStore::new();
        let seller = seed_user(&store, "seller", Role::Seller).await;
        let service = CartService::new(store);
        let err = service.view_cart(seller.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }
}
