use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    CartItem, Message, Order, OrderDetails, OrderPlacement, OrderStatuses, Product, ProductFilter,
    ProductUpdate, Review, Role, User,
};

use crate::Result;

/// Core trait for marketplace persistence.
///
/// Every method is one transaction. Methods that touch several rows
/// (`commit_checkout`, `cancel_order`, `delete_product`) either apply all of
/// their writes or none. Status updates are compare-and-set: they return
/// `false` without writing when the stored statuses differ from `expected`.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- Users --

    /// Inserts a user. Fails with `Duplicate` if the email or username is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Lists users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Changes a user's role. Returns false if the user does not exist.
    async fn set_user_role(&self, id: UserId, role: Role, at: DateTime<Utc>) -> Result<bool>;

    // -- Products --

    async fn insert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products matching the filter, oldest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;

    /// Writes only the fields `update` sets and returns the stored product, or
    /// `None` if it does not exist. Unset fields keep their stored values, so a
    /// concurrent stock decrement is never overwritten by an edit that does not
    /// touch `quantity_available`.
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Product>>;

    /// Deletes a product together with its cart rows and reviews.
    ///
    /// Fails with `ProductHasOrderHistory` if any order item references it
    /// and with `NotFound` if it does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    // -- Cart --

    async fn get_cart_item(&self, buyer: UserId, product: ProductId) -> Result<Option<CartItem>>;

    /// Adds `item.quantity` to the (buyer, product) row, inserting it when
    /// absent, and returns the resulting row.
    ///
    /// The increment and the availability check happen in one transaction;
    /// if the resulting quantity exceeds what the product can sell, nothing is
    /// written and `OutOfStock` reports it.
    async fn add_cart_item(&self, item: &CartItem) -> Result<CartItem>;

    /// Replaces the quantity of an existing row after checking availability.
    /// Returns `None` if the row does not exist.
    async fn set_cart_quantity(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>>;

    /// Deletes one row. Returns false if it did not exist.
    async fn delete_cart_item(&self, buyer: UserId, product: ProductId) -> Result<bool>;

    /// Lists a buyer's rows joined with their products, in the order they were added.
    async fn list_cart(&self, buyer: UserId) -> Result<Vec<(CartItem, Product)>>;

    /// Deletes every row of a buyer's cart. Returns the number of rows removed.
    async fn clear_cart(&self, buyer: UserId) -> Result<u64>;

    // -- Orders --

    /// Atomically persists a checkout.
    ///
    /// Inserts the order and its items, decrements each product's
    /// `quantity_available` by the item quantity, and deletes the cart rows of
    /// the placed products. Rows added after the placement was built stay.
    /// Each decrement re-checks availability; if any product cannot cover its
    /// item the transaction rolls back and `InsufficientStock` names it.
    async fn commit_checkout(&self, placement: &OrderPlacement) -> Result<()>;

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>>;

    async fn find_order_by_payment_intent(&self, payment_intent_id: &str)
    -> Result<Option<Order>>;

    /// Orders placed by a buyer, newest first.
    async fn list_orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>>;

    /// Orders containing at least one product of the seller, newest first.
    async fn list_orders_for_seller(&self, seller: UserId) -> Result<Vec<Order>>;

    /// Every order, newest first.
    async fn list_all_orders(&self) -> Result<Vec<Order>>;

    /// Records a new payment intent and resets the payment status to pending,
    /// if the order still has `expected` statuses.
    async fn attach_payment_intent(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        payment_intent_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Compare-and-set of both status fields.
    async fn update_order_statuses(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Compare-and-set of the statuses to `next` (a cancelled status) that also
    /// returns every item's quantity to its product, in one transaction.
    async fn cancel_order(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    // -- Reviews & messages --

    async fn insert_review(&self, review: &Review) -> Result<()>;

    /// Reviews of a product, newest first.
    async fn list_reviews(&self, product: ProductId) -> Result<Vec<Review>>;

    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Messages exchanged between two users in either direction, oldest first.
    async fn list_conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>>;
}
