//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{
    CartItem, Money, NewMessage, NewProduct, NewReview, NewUser, OrderPlacement, OrderStatus,
    OrderStatuses, PaymentStatus, Product, ProductFilter, ProductUpdate, Role, User,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{MarketStore, PostgresStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_marketplace_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE messages, reviews, order_items, orders, cart_items, products, users",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_user(store: &PostgresStore, name: &str, role: Role) -> User {
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

async fn seed_product(store: &PostgresStore, seller: UserId, price: &str, qty: u32) -> Product {
    let product = NewProduct {
        title: "Widget".to_string(),
        description: "A widget".to_string(),
        price: Money::parse(price).unwrap(),
        quantity_available: qty,
        images: vec!["https://img.example.com/w.png".to_string()],
        category: "tools".to_string(),
    }
    .into_product(seller, Utc::now())
    .unwrap();
    store.insert_product(&product).await.unwrap();
    product
}

async fn add_to_cart(store: &PostgresStore, buyer: UserId, product: ProductId, quantity: u32) {
    store
        .add_cart_item(&CartItem {
            buyer_id: buyer,
            product_id: product,
            quantity,
            added_at: Utc::now(),
        })
        .await
        .unwrap();
}

async fn placement_for(store: &PostgresStore, buyer: UserId) -> OrderPlacement {
    let cart = store.list_cart(buyer).await.unwrap();
    OrderPlacement::from_cart(buyer, &cart, Utc::now()).unwrap()
}

#[tokio::test]
#[serial]
async fn user_roundtrip_and_duplicates() {
    let store = get_test_store().await;
    let user = seed_user(&store, "ada", Role::Seller).await;

    let loaded = store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(loaded.email, "ada@example.com");
    assert_eq!(loaded.role, Role::Seller);

    let mut dup = user.clone();
    dup.id = UserId::new();
    dup.username = "someone-else".to_string();
    let err = store.insert_user(&dup).await.unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(ref what) if what == "email"));

    assert!(store.set_user_role(user.id, Role::Admin, Utc::now()).await.unwrap());
    assert!(!store.set_user_role(UserId::new(), Role::Admin, Utc::now()).await.unwrap());
}

#[tokio::test]
#[serial]
async fn product_price_and_images_roundtrip() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let product = seed_product(&store, seller.id, "19.99", 4).await;

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, Money::parse("19.99").unwrap());
    assert_eq!(loaded.images, product.images);
    assert_eq!(loaded.quantity_available, 4);

    let filtered = store
        .list_products(&ProductFilter {
            category: Some("tools".to_string()),
            seller_id: Some(seller.id),
            include_inactive: false,
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
#[serial]
async fn product_with_unknown_seller_is_not_found() {
    let store = get_test_store().await;
    let product = NewProduct {
        title: "Orphan".to_string(),
        description: String::new(),
        price: Money::parse("1.00").unwrap(),
        quantity_available: 1,
        images: vec![],
        category: "misc".to_string(),
    }
    .into_product(UserId::new(), Utc::now())
    .unwrap();

    let err = store.insert_product(&product).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "user", .. }));
}

#[tokio::test]
#[serial]
async fn checkout_commits_order_items_stock_and_cart() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let a = seed_product(&store, seller.id, "10.00", 5).await;
    let b = seed_product(&store, seller.id, "5.00", 5).await;
    add_to_cart(&store, buyer.id, a.id, 2).await;
    add_to_cart(&store, buyer.id, b.id, 1).await;

    let placement = placement_for(&store, buyer.id).await;
    store.commit_checkout(&placement).await.unwrap();

    let details = store.get_order(placement.order.id).await.unwrap().unwrap();
    assert_eq!(details.order.total_amount, Money::parse("25.00").unwrap());
    assert_eq!(details.order.order_status, OrderStatus::Pending);
    assert_eq!(details.items.len(), 2);
    assert!(details.is_consistent());

    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().quantity_available, 3);
    assert_eq!(store.get_product(b.id).await.unwrap().unwrap().quantity_available, 4);
    assert!(store.list_cart(buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn checkout_rolls_back_when_stock_changed() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let a = seed_product(&store, seller.id, "10.00", 5).await;
    let b = seed_product(&store, seller.id, "5.00", 5).await;
    add_to_cart(&store, buyer.id, a.id, 2).await;
    add_to_cart(&store, buyer.id, b.id, 3).await;

    let placement = placement_for(&store, buyer.id).await;

    // Stock drops between validation and commit.
    let restock = ProductUpdate {
        quantity_available: Some(1),
        ..Default::default()
    };
    store.update_product(b.id, &restock, Utc::now()).await.unwrap();

    let err = store.commit_checkout(&placement).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock(id) if id == b.id));

    assert!(store.get_order(placement.order.id).await.unwrap().is_none());
    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().quantity_available, 5);
    assert_eq!(store.list_cart(buyer.id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn concurrent_checkouts_for_last_unit() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let first = seed_user(&store, "first", Role::Buyer).await;
    let second = seed_user(&store, "second", Role::Buyer).await;
    let product = seed_product(&store, seller.id, "7.50", 1).await;
    add_to_cart(&store, first.id, product.id, 1).await;
    add_to_cart(&store, second.id, product.id, 1).await;

    let p1 = placement_for(&store, first.id).await;
    let p2 = placement_for(&store, second.id).await;

    let (r1, r2) = tokio::join!(store.commit_checkout(&p1), store.commit_checkout(&p2));
    let successes = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);

    let failure = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(
        failure.unwrap_err(),
        StoreError::InsufficientStock(_) | StoreError::Conflict(_)
    ));
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().quantity_available,
        0
    );
}

#[tokio::test]
#[serial]
async fn status_updates_are_compare_and_set() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let product = seed_product(&store, seller.id, "3.00", 2).await;
    add_to_cart(&store, buyer.id, product.id, 1).await;
    let placement = placement_for(&store, buyer.id).await;
    store.commit_checkout(&placement).await.unwrap();
    let id = placement.order.id;

    let pending = OrderStatuses::new(OrderStatus::Pending, PaymentStatus::Pending);
    assert!(store.attach_payment_intent(id, pending, "pi_test_1", Utc::now()).await.unwrap());

    let order = store.find_order_by_payment_intent("pi_test_1").await.unwrap().unwrap();
    assert_eq!(order.id, id);

    let paid = OrderStatuses::new(OrderStatus::Processing, PaymentStatus::Paid);
    assert!(store.update_order_statuses(id, pending, paid, Utc::now()).await.unwrap());
    // Stale expectation no longer matches.
    assert!(!store.update_order_statuses(id, pending, paid, Utc::now()).await.unwrap());

    let orders = store.list_orders_for_seller(seller.id).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[serial]
async fn cancel_restocks_once() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let product = seed_product(&store, seller.id, "3.00", 4).await;
    add_to_cart(&store, buyer.id, product.id, 3).await;
    let placement = placement_for(&store, buyer.id).await;
    store.commit_checkout(&placement).await.unwrap();

    let pending = OrderStatuses::new(OrderStatus::Pending, PaymentStatus::Pending);
    let cancelled = pending.with_order_status(OrderStatus::Cancelled);
    let id = placement.order.id;

    assert!(store.cancel_order(id, pending, cancelled, Utc::now()).await.unwrap());
    assert!(!store.cancel_order(id, pending, cancelled, Utc::now()).await.unwrap());
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().quantity_available,
        4
    );
}

#[tokio::test]
#[serial]
async fn delete_product_respects_order_history() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let sold = seed_product(&store, seller.id, "3.00", 4).await;
    let unsold = seed_product(&store, seller.id, "3.00", 4).await;
    add_to_cart(&store, buyer.id, sold.id, 1).await;
    let placement = placement_for(&store, buyer.id).await;
    store.commit_checkout(&placement).await.unwrap();

    let err = store.delete_product(sold.id).await.unwrap_err();
    assert!(matches!(err, StoreError::ProductHasOrderHistory(_)));

    add_to_cart(&store, buyer.id, unsold.id, 1).await;
    let review = NewReview {
        rating: 4,
        comment: "Solid".to_string(),
    }
    .into_review(unsold.id, buyer.id, Utc::now())
    .unwrap();
    store.insert_review(&review).await.unwrap();

    store.delete_product(unsold.id).await.unwrap();
    assert!(store.get_product(unsold.id).await.unwrap().is_none());
    assert!(store.list_cart(buyer.id).await.unwrap().is_empty());

    let err = store.delete_product(unsold.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
#[serial]
async fn conversation_lists_both_directions() {
    let store = get_test_store().await;
    let a = seed_user(&store, "alice", Role::Buyer).await;
    let b = seed_user(&store, "bob", Role::Seller).await;

    let first = NewMessage {
        receiver_id: b.id,
        content: "Is this in stock?".to_string(),
    }
    .into_message(a.id, Utc::now())
    .unwrap();
    store.insert_message(&first).await.unwrap();

    let reply = NewMessage {
        receiver_id: a.id,
        content: "Yes".to_string(),
    }
    .into_message(b.id, Utc::now())
    .unwrap();
    store.insert_message(&reply).await.unwrap();

    let conversation = store.list_conversation(b.id, a.id).await.unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0].id, first.id);
}

#[tokio::test]
#[serial]
async fn title_update_does_not_restore_sold_stock() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let other = seed_user(&store, "other", Role::Buyer).await;
    let product = seed_product(&store, seller.id, "3.00", 1).await;
    add_to_cart(&store, buyer.id, product.id, 1).await;
    add_to_cart(&store, other.id, product.id, 1).await;

    let placement = placement_for(&store, buyer.id).await;
    store.commit_checkout(&placement).await.unwrap();

    let rename = ProductUpdate {
        title: Some("Renamed".to_string()),
        ..Default::default()
    };
    let updated = store
        .update_product(product.id, &rename, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.quantity_available, 0);

    // The second buyer's cart was built before the sale and must not get the unit.
    let late = placement_for(&store, other.id).await;
    let err = store.commit_checkout(&late).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock(id) if id == product.id));
}

#[tokio::test]
#[serial]
async fn concurrent_cart_adds_accumulate() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let product = seed_product(&store, seller.id, "1.00", 10).await;

    let row = |quantity| CartItem {
        buyer_id: buyer.id,
        product_id: product.id,
        quantity,
        added_at: Utc::now(),
    };
    let (two, three) = (row(2), row(3));
    let (first, second) = tokio::join!(store.add_cart_item(&two), store.add_cart_item(&three));
    first.unwrap();
    second.unwrap();

    let item = store.get_cart_item(buyer.id, product.id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 5);

    let err = store.add_cart_item(&row(6)).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::OutOfStock {
            requested: 11,
            available: 10,
            ..
        }
    ));
    let item = store.get_cart_item(buyer.id, product.id).await.unwrap().unwrap();
    assert_eq!(item.quantity, 5);
}

#[tokio::test]
#[serial]
async fn checkout_keeps_cart_rows_added_after_placement() {
    let store = get_test_store().await;
    let seller = seed_user(&store, "seller", Role::Seller).await;
    let buyer = seed_user(&store, "buyer", Role::Buyer).await;
    let a = seed_product(&store, seller.id, "1.00", 5).await;
    let b = seed_product(&store, seller.id, "2.00", 5).await;
    add_to_cart(&store, buyer.id, a.id, 1).await;
    let placement = placement_for(&store, buyer.id).await;

    add_to_cart(&store, buyer.id, b.id, 2).await;
    store.commit_checkout(&placement).await.unwrap();

    let cart = store.list_cart(buyer.id).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].0.product_id, b.id);
}
