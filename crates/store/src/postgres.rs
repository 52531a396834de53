use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{MessageId, OrderId, OrderItemId, ProductId, ReviewId, UserId};
use domain::{
    CartItem, Message, Money, Order, OrderDetails, OrderItem, OrderPlacement, OrderStatuses,
    Product, ProductFilter, ProductUpdate, Review, Role, User,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{MarketStore, Result, StoreError};

const PRODUCT_COLUMNS: &str = "id, seller_id, title, description, price, quantity_available, \
     images, category, active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, buyer_id, total_amount, order_status, payment_status, \
     payment_intent_id, created_at, updated_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(map_db_error)
    }
}

// -- Row types --

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            username: row.username,
            name: row.name,
            role: row.role.parse().map_err(corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    seller_id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    quantity_available: i32,
    images: Vec<String>,
    category: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            seller_id: UserId::from_uuid(row.seller_id),
            title: row.title,
            description: row.description,
            price: Money::new(row.price).map_err(corrupt)?,
            quantity_available: from_i32(row.quantity_available)?,
            images: row.images,
            category: row.category,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CartRow {
    user_id: Uuid,
    quantity: i32,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(Debug, FromRow)]
struct CartItemRow {
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    added_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self> {
        Ok(CartItem {
            buyer_id: UserId::from_uuid(row.user_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: from_i32(row.quantity)?,
            added_at: row.added_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    total_amount: Decimal,
    order_status: String,
    payment_status: String,
    payment_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            total_amount: Money::new(row.total_amount).map_err(corrupt)?,
            order_status: row.order_status.parse().map_err(corrupt)?,
            payment_status: row.payment_status.parse().map_err(corrupt)?,
            payment_intent_id: row.payment_intent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self> {
        Ok(OrderItem {
            id: OrderItemId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: from_i32(row.quantity)?,
            unit_price: Money::new(row.unit_price).map_err(corrupt)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    buyer_id: Uuid,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self> {
        Ok(Review {
            id: ReviewId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            buyer_id: UserId::from_uuid(row.buyer_id),
            rating: u8::try_from(row.rating)
                .map_err(|_| StoreError::DataCorruption(format!("rating {}", row.rating)))?,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: MessageId::from_uuid(row.id),
            sender_id: UserId::from_uuid(row.sender_id),
            receiver_id: UserId::from_uuid(row.receiver_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

// -- Helpers --

fn corrupt(e: impl std::fmt::Display) -> StoreError {
    StoreError::DataCorruption(e.to_string())
}

fn from_i32(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::DataCorruption(format!("negative quantity {value}")))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::DataCorruption(format!("quantity {value} out of range")))
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Maps serialization failures and deadlocks to `Conflict` and unique
/// violations to `Duplicate`.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        match db_err.code().as_deref() {
            Some("40001") | Some("40P01") => {
                return StoreError::Conflict(db_err.message().to_string());
            }
            Some("23505") => {
                let what = match db_err.constraint() {
                    Some("users_email_key") => "email",
                    Some("users_username_key") => "username",
                    Some("orders_payment_intent_key") => "payment intent",
                    Some(other) => other,
                    None => "value",
                };
                return StoreError::Duplicate(what.to_string());
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

/// Like [`map_db_error`], but reports a foreign key violation as the missing parent.
/// Units a product can sell, read under a share lock so a concurrent
/// checkout or edit of the row waits for this transaction.
async fn sellable_units(tx: &mut Transaction<'_, Postgres>, id: ProductId) -> Result<u32> {
    let row: Option<(i32, bool)> =
        sqlx::query_as("SELECT quantity_available, active FROM products WHERE id = $1 FOR SHARE")
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?;
    match row {
        Some((quantity, true)) => from_i32(quantity),
        Some((_, false)) => Ok(0),
        None => Err(StoreError::not_found("product", id)),
    }
}

fn map_fk_error(e: sqlx::Error, entity: &'static str, id: impl ToString) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.code().as_deref() == Some("23503")
    {
        return StoreError::not_found(entity, id);
    }
    map_db_error(e)
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, username, name, role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, username, name, role, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, username, name, role, created_at, updated_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn set_user_role(&self, id: UserId, role: Role, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(role.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, title, description, price, quantity_available,
                                  images, category, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.seller_id.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(to_i32(product.quantity_available)?)
        .bind(&product.images)
        .bind(&product.category)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_error(e, "user", product.seller_id))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1");
        let mut param_count = 0;

        if !filter.include_inactive {
            sql.push_str(" AND active");
        }
        if filter.category.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }
        if filter.seller_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND seller_id = ${param_count}"));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut query = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(ref category) = filter.category {
            query = query.bind(category);
        }
        if let Some(seller_id) = filter.seller_id {
            query = query.bind(seller_id.as_uuid());
        }

        let rows = query.fetch_all(&self.pool).await?;
        collect(rows)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
        at: DateTime<Utc>,
    ) -> Result<Option<Product>> {
        // NULL parameters keep the stored column, so stock is only written
        // when the update sets it.
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r#"
            UPDATE products
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                quantity_available = COALESCE($5, quantity_available),
                images = COALESCE($6, images),
                category = COALESCE($7, category),
                active = COALESCE($8, active),
                updated_at = $9
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.price.map(|price| price.amount()))
        .bind(update.quantity_available.map(to_i32).transpose()?)
        .bind(update.images.as_deref())
        .bind(update.category.as_deref())
        .bind(update.active)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;
        row.map(Product::try_from).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut tx = self.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if exists.is_none() {
            return Err(StoreError::not_found("product", id));
        }

        let has_history: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_error)?;
        if has_history {
            return Err(StoreError::ProductHasOrderHistory(id));
        }

        for statement in [
            "DELETE FROM cart_items WHERE product_id = $1",
            "DELETE FROM reviews WHERE product_id = $1",
            "DELETE FROM products WHERE id = $1",
        ] {
            sqlx::query(statement)
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| match map_fk_error(e, "product", id) {
                    // An order item was inserted concurrently.
                    StoreError::NotFound { .. } => StoreError::ProductHasOrderHistory(id),
                    other => other,
                })?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn get_cart_item(&self, buyer: UserId, product: ProductId) -> Result<Option<CartItem>> {
        let row: Option<CartItemRow> = sqlx::query_as(
            r#"
            SELECT user_id, product_id, quantity, added_at
            FROM cart_items
            WHERE user_id = $1 AND product_id = $2
            "#,
        )
        .bind(buyer.as_uuid())
        .bind(product.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(CartItem::try_from).transpose()
    }

    async fn add_cart_item(&self, item: &CartItem) -> Result<CartItem> {
        let mut tx = self.begin().await?;

        let available = sellable_units(&mut tx, item.product_id).await?;

        // The conflicting row is locked by the upsert, so concurrent adds for
        // the same pair queue here and each sees the other's increment.
        let row: CartItemRow = sqlx::query_as(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity, added_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING user_id, product_id, quantity, added_at
            "#,
        )
        .bind(item.buyer_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(to_i32(item.quantity)?)
        .bind(item.added_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_fk_error(e, "user", item.buyer_id))?;

        let row = CartItem::try_from(row)?;
        if row.quantity > available {
            return Err(StoreError::OutOfStock {
                product_id: item.product_id,
                requested: row.quantity,
                available,
            });
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(row)
    }

    async fn set_cart_quantity(
        &self,
        buyer: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<CartItem>> {
        let mut tx = self.begin().await?;

        let available = sellable_units(&mut tx, product).await?;

        let row: Option<CartItemRow> = sqlx::query_as(
            r#"
            UPDATE cart_items SET quantity = $3
            WHERE user_id = $1 AND product_id = $2
            RETURNING user_id, product_id, quantity, added_at
            "#,
        )
        .bind(buyer.as_uuid())
        .bind(product.as_uuid())
        .bind(to_i32(quantity)?)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        if quantity > available {
            return Err(StoreError::OutOfStock {
                product_id: product,
                requested: quantity,
                available,
            });
        }

        tx.commit().await.map_err(map_db_error)?;
        CartItem::try_from(row).map(Some)
    }

    async fn delete_cart_item(&self, buyer: UserId, product: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(buyer.as_uuid())
            .bind(product.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_cart(&self, buyer: UserId) -> Result<Vec<(CartItem, Product)>> {
        let rows: Vec<CartRow> = sqlx::query_as(
            r#"
            SELECT c.user_id, c.quantity, c.added_at,
                   p.id, p.seller_id, p.title, p.description, p.price, p.quantity_available,
                   p.images, p.category, p.active, p.created_at, p.updated_at
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at ASC, c.product_id ASC
            "#,
        )
        .bind(buyer.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let item = CartItem {
                    buyer_id: UserId::from_uuid(row.user_id),
                    product_id: ProductId::from_uuid(row.product.id),
                    quantity: from_i32(row.quantity)?,
                    added_at: row.added_at,
                };
                Ok((item, Product::try_from(row.product)?))
            })
            .collect()
    }

    async fn clear_cart(&self, buyer: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(buyer.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, placement), fields(order_id = %placement.order.id))]
    async fn commit_checkout(&self, placement: &OrderPlacement) -> Result<()> {
        let order = &placement.order;
        let mut tx = self.begin().await?;

        // Decrement in product-id order so competing checkouts queue on the
        // same row locks instead of deadlocking. A blocked update re-reads
        // the row once the other transaction commits, so the availability
        // check always sees the latest stock.
        for item in placement.items_in_lock_order() {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET quantity_available = quantity_available - $2, updated_at = $3
                WHERE id = $1 AND active AND quantity_available >= $2
                "#,
            )
            .bind(item.product_id.as_uuid())
            .bind(to_i32(item.quantity)?)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if result.rows_affected() == 0 {
                tracing::debug!(product_id = %item.product_id, "stock re-check failed");
                return Err(StoreError::InsufficientStock(item.product_id));
            }
        }

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, total_amount, order_status, payment_status,
                                payment_intent_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.total_amount.amount())
        .bind(order.order_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.payment_intent_id.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_fk_error(e, "user", order.buyer_id))?;

        for item in &placement.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(to_i32(item.quantity)?)
            .bind(item.unit_price.amount())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        let placed: Vec<Uuid> = placement
            .items
            .iter()
            .map(|item| item.product_id.as_uuid())
            .collect();
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = ANY($2)")
            .bind(order.buyer_id.as_uuid())
            .bind(&placed)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderDetails {
            order: Order::try_from(row)?,
            items: collect(item_rows)?,
        }))
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders_for_buyer(&self, buyer: UserId) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(buyer.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_orders_for_seller(&self, seller: UserId) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders o
            WHERE EXISTS (
                SELECT 1 FROM order_items oi
                JOIN products p ON p.id = oi.product_id
                WHERE oi.order_id = o.id AND p.seller_id = $1
            )
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(seller.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn attach_payment_intent(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        payment_intent_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_intent_id = $4, payment_status = 'pending', updated_at = $5
            WHERE id = $1 AND order_status = $2 AND payment_status = $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.order_status.as_str())
        .bind(expected.payment_status.as_str())
        .bind(payment_intent_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_order_statuses(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $4, payment_status = $5, updated_at = $6
            WHERE id = $1 AND order_status = $2 AND payment_status = $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.order_status.as_str())
        .bind(expected.payment_status.as_str())
        .bind(next.order_status.as_str())
        .bind(next.payment_status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_order(
        &self,
        id: OrderId,
        expected: OrderStatuses,
        next: OrderStatuses,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $4, payment_status = $5, updated_at = $6
            WHERE id = $1 AND order_status = $2 AND payment_status = $3
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected.order_status.as_str())
        .bind(expected.payment_status.as_str())
        .bind(next.order_status.as_str())
        .bind(next.payment_status.as_str())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY product_id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        for item in items {
            sqlx::query(
                r#"
                UPDATE products
                SET quantity_available = quantity_available + $2, updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, buyer_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.product_id.as_uuid())
        .bind(review.buyer_id.as_uuid())
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_error(e, "product", review.product_id))?;
        Ok(())
    }

    async fn list_reviews(&self, product: ProductId) -> Result<Vec<Review>> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r#"
            SELECT id, product_id, buyer_id, rating, comment, created_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(product.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.sender_id.as_uuid())
        .bind(message.receiver_id.as_uuid())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_error(e, "user", message.receiver_id))?;
        Ok(())
    }

    async fn list_conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(a.as_uuid())
        .bind(b.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }
}
