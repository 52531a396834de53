use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{
    CartItem, Message, Order, OrderDetails, OrderItem, OrderPlacement, OrderStatuses, Product,
    ProductFilter, ProductUpdate, Review, Role, User,
};
use tokio::sync::RwLock;

use crate::{MarketStore, Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    cart: Vec<CartItem>,
    orders: HashMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    reviews: Vec<Review>,
    messages: Vec<Message>,
}

impl Tables {
    fn items_of(&self, order_id: OrderId) -> Vec<OrderItem> {
        self.order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    fn newest_first(&self, mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }
}

/// In-memory store for tests and single-process deployments.
///
/// All tables live behind one lock, so every call observes and produces a
/// consistent snapshot, the equivalent of a serializable transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }

        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn set_user_role(&self, id: UserId, role: Role, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&product.seller_id) {
            return Err(StoreError::not_found("user", product.seller_id));
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(&id).map(|product| {
            product.apply_update(update, at);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tables = self.tables.write().await;

        if !tables.products.contains_key(&id) {
            return Err(StoreError::not_found("product", id));
        }
        if tables.order_items.iter().any(|item| item.product_id == id) {
            return Err(StoreError::ProductHasOrderHistory(id));
        }

        tables.products.remove(&id);
        tables.cart.retain(|row| row.product_id != id);
        tables.reviews.retain(|review| review.product_id != id);
        Ok(())
    }

    async fn get_cart_item(&self, buyer: UserId, product: ProductId) -> Result<Option<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart
            .iter()
            .find(|row| row.buyer_id == buyer && row.product_id == product)
            .cloned())
    }

    async fn add_cart_item(&self, item: &CartItem) -> Result<CartItem> {
        let mut tables = self.tables.write().await;

        let available = tables
            .products
            .get(&item.product_id)
            .map(Product::available_quantity)
            .ok_or_else(|| StoreError::not_found("product", item.product_id))?;
        let current = tables
            .cart
            .iter()
            .find(|row| row.buyer_id == item.buyer_id && row.product_id == item.product_id)
            .map_or(0, |row| row.quantity);
        let requested = current.saturating_add(item.quantity);
        if requested > available {
            return Err(StoreError::OutOfStock {
                product_id: item.product_id,
                requested,
                available,
            });
        }

        match tables
            .cart
            .iter_mut()
            .find(|row| row.buyer_id == item.buyer_id && row.product_id == item.product_id)
        {
            Some(row) => {
                row.quantity = requested;
                Ok(row.clone())
            }
            None => {
                tables.cart.push(item.clone());
                Ok(item.clone())
            }
        }
    }

    async fn set_cart_quantity(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let mut tables = self.tables.write().await;

        if !tables
            .cart
            .iter()
            .any(|row| row.buyer_id == buyer && row.product_id == product)
        {
            return Ok(None);
        }
        let available = tables
            .products
            .get(&product)
            .map(Product::available_quantity)
            .ok_or_else(|| StoreError::not_found("product", product))?;
        if quantity > available {
            return Err(StoreError::OutOfStock {
                product_id: product,
                requested: quantity,
                available,
            });
        }

        Ok(tables
            .cart
            .iter_mut()
            .find(|row| row.buyer_id == buyer && row.product_id == product)
            .map(|row| {
                row.quantity = quantity;
                row.clone()
            }))
    }

    async fn delete_cart_item(&self, buyer: UserId, product: ProductId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables
            .cart
            .retain(|row| !(row.buyer_id == buyer && row.product_id == product));
        Ok(tables.cart.len() != before)
    }

    async fn list_cart(&self, buyer: UserId) -> Result<Vec<(CartItem, Product)>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<(CartItem, Product)> = tables
            .cart
            .iter()
            .filter(|row| row.buyer_id == buyer)
            .filter_map(|row| {
                tables
                    .products
                    .get(&row.product_id)
                    .map(|product| (row.clone(), product.clone()))
            })
            .collect();
        rows.sort_by(|(a, _), (b, _)| {
            a.added_at
                .cmp(&b.added_at)
                .then(a.product_id.cmp(&b.product_id))
        });
        Ok(rows)
    }

    async fn clear_cart(&self, buyer: UserId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables.cart.retain(|row| row.buyer_id != buyer);
        Ok((before - tables.cart.len()) as u64)
    }

    async fn commit_checkout(&self, placement: &OrderPlacement) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate every line before touching anything so a failure leaves no trace.
        for item in placement.items_in_lock_order() {
            let available = tables
                .products
                .get(&item.product_id)
                .map(Product::available_quantity)
                .unwrap_or(0);
            if item.quantity > available {
                return Err(StoreError::InsufficientStock(item.product_id));
            }
        }

        let now = placement.order.created_at;
        for item in &placement.items {
            if let Some(product) = tables.products.get_mut(&item.product_id) {
                product.quantity_available -= item.quantity;
                product.updated_at = now;
            }
        }

        let buyer = placement.order.buyer_id;
        tables.orders.insert(placement.order.id, placement.order.clone());
        tables.order_items.extend(placement.items.iter().cloned());
        tables.cart.retain(|row| {
            row.buyer_id != buyer
                || !placement
                    .items
                    .iter()
                    .any(|item| item.product_id == row.product_id)
        });

        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).map(|order| OrderDetails {
            order: order.clone(),
            items: tables.items_of(id),
        }))
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn list_orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer)
            .cloned()
            .collect();
        Ok(tables.newest_first(orders))
    }

    async fn list_orders_for_seller(&self, seller: UserId) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let order_ids: HashSet<OrderId> = tables
            .order_items
            .iter()
            .filter(|item| {
                tables
                    .products
                    .get(&item.product_id)
                    .is_some_and(|p| p.seller_id == seller)
            })
            .map(|item| item.order_id)
            .collect();
        let orders = order_ids
            .iter()
            .filter_map(|id| tables.orders.get(id).cloned())
            .collect();
        Ok(tables.newest_first(orders))
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let orders = tables.orders.values().cloned().collect();
        Ok(tables.newest_first(orders))
    }

    async fn attach_payment_intent(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        payment_intent_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;

        if tables
            .orders
            .values()
            .any(|o| o.id != id && o.payment_intent_id.as_deref() == Some(payment_intent_id))
        {
            return Err(StoreError::Duplicate(format!(
                "payment intent {payment_intent_id}"
            )));
        }

        match tables.orders.get_mut(&id) {
            Some(order) if order.statuses() == expected => {
                order.payment_intent_id = Some(payment_intent_id.to_string());
                order.payment_status = domain::PaymentStatus::Pending;
                order.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_order_statuses(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.get_mut(&id) {
            Some(order) if order.statuses() == expected => {
                order.order_status = next.order_status;
                order.payment_status = next.payment_status;
                order.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel_order(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;

        match tables.orders.get(&id) {
            Some(order) if order.statuses() == expected => {}
            _ => return Ok(false),
        }

        let items = tables.items_of(id);
        for item in &items {
            let product = tables
                .products
                .get(&item.product_id)
                .ok_or_else(|| StoreError::not_found("product", item.product_id))?;
            if product.quantity_available.checked_add(item.quantity).is_none() {
                return Err(StoreError::DataCorruption(format!(
                    "restocking product {} overflows",
                    item.product_id
                )));
            }
        }

        for item in &items {
            if let Some(product) = tables.products.get_mut(&item.product_id) {
                product.quantity_available += item.quantity;
                product.updated_at = at;
            }
        }
        if let Some(order) = tables.orders.get_mut(&id) {
            order.order_status = next.order_status;
            order.payment_status = next.payment_status;
            order.updated_at = at;
        }
        Ok(true)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&review.product_id) {
            return Err(StoreError::not_found("product", review.product_id));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }

    async fn list_reviews(&self, product: ProductId) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.product_id == product)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&message.receiver_id) {
            return Err(StoreError::not_found("user", message.receiver_id));
        }
        tables.messages.push(message.clone());
        Ok(())
    }

    async fn list_conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect();
        messages.sort_by(|x, y| x.created_at.cmp(&y.created_at).then(x.id.cmp(&y.id)));
        Ok(messages)
    }
}
