//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use serial_test::serial;
use store::{
    LineItemRepository, Money, NewProduct, NewUser, OrderId, OrderRepository, OrderStatus,
    PostgresStore, ProductId, ProductRepository, ProductUpdate, Quantity, StoreError, UserId,
    UserRepository, constraints,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let store = PostgresStore::connect(
                &connection_string,
                2,
                std::time::Duration::from_secs(10),
            )
            .await
            .unwrap();
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and emptied tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let store = PostgresStore::connect(
        &info.connection_string,
        5,
        std::time::Duration::from_secs(10),
    )
    .await
    .unwrap();
    store.truncate_all().await.unwrap();
    store
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        first_name: "Jane".to_string(),
        last_name: "Roe".to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_digest: "digest".to_string(),
    }
}

fn new_product(name: &str, cents: i64, category: Option<&str>) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        price: Money::from_cents(cents).unwrap(),
        category: category.map(str::to_string),
        description: None,
    }
}

fn qty(n: i64) -> Quantity {
    Quantity::new(n).unwrap()
}

async fn seeded() -> (PostgresStore, UserId, ProductId) {
    let store = get_test_store().await;
    let user = store.insert_user(new_user("jane")).await.unwrap();
    let product = store
        .insert_product(new_product("Batteries", 5000, Some("Electronics")))
        .await
        .unwrap();
    (store, user.id, product.id)
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn order_lifecycle_round_trips() {
    let (store, user_id, _) = seeded().await;

    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();
    assert_eq!(order.id, OrderId::new(1));
    assert_eq!(order.owner_id, user_id);

    let updated = store
        .update_order_status(order.id, OrderStatus::Complete)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Complete);

    let found = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(found, updated);

    let deleted = store.delete_order(order.id).await.unwrap();
    assert_eq!(deleted, Some(updated));
    assert!(store.find_order(order.id).await.unwrap().is_none());
    assert!(store.delete_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn insert_order_with_unknown_owner_names_constraint() {
    let store = get_test_store().await;

    let err = store
        .insert_order(OrderStatus::Active, UserId::new(99))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
    assert_eq!(err.constraint(), Some(constraints::ORDERS_USER_ID_FKEY));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn merge_line_item_upserts() {
    let (store, user_id, product_id) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();

    let first = store
        .merge_line_item(order.id, product_id, qty(2))
        .await
        .unwrap();
    assert_eq!(first.quantity.get(), 2);

    let second = store
        .merge_line_item(order.id, product_id, qty(3))
        .await
        .unwrap();
    assert_eq!(second.quantity.get(), 5);

    let items = store.list_line_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn concurrent_merges_do_not_lose_updates() {
    let (store, user_id, product_id) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.merge_line_item(order.id, product_id, qty(1)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let items = store.list_line_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity.get(), 10);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn merge_overflow_maps_to_quantity_out_of_range() {
    let (store, user_id, product_id) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();

    store
        .merge_line_item(order.id, product_id, qty(i32::MAX as i64))
        .await
        .unwrap();
    let err = store
        .merge_line_item(order.id, product_id, qty(1))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::QuantityOutOfRange));
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn merge_with_unknown_product_names_constraint() {
    let (store, user_id, _) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();

    let err = store
        .merge_line_item(order.id, ProductId::new(404), qty(1))
        .await
        .unwrap_err();

    assert_eq!(
        err.constraint(),
        Some(constraints::ORDER_PRODUCTS_PRODUCT_ID_FKEY)
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn delete_order_is_blocked_until_line_items_are_removed() {
    let (store, user_id, product_id) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();
    store
        .merge_line_item(order.id, product_id, qty(1))
        .await
        .unwrap();

    let err = store.delete_order(order.id).await.unwrap_err();
    assert_eq!(
        err.constraint(),
        Some(constraints::ORDER_PRODUCTS_ORDER_ID_FKEY)
    );

    let removed = store.delete_line_items(order.id).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert!(store.delete_order(order.id).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn set_and_delete_single_line_item() {
    let (store, user_id, product_id) = seeded().await;
    let order = store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();

    assert!(
        store
            .set_line_item_quantity(order.id, product_id, qty(4))
            .await
            .unwrap()
            .is_none()
    );

    store
        .merge_line_item(order.id, product_id, qty(1))
        .await
        .unwrap();
    let set = store
        .set_line_item_quantity(order.id, product_id, qty(4))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(set.quantity.get(), 4);

    let removed = store
        .delete_line_item(order.id, product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.quantity.get(), 4);
    assert!(store.list_line_items(order.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn orders_by_owner_respect_status_filter() {
    let (store, user_id, _) = seeded().await;
    let other = store.insert_user(new_user("john")).await.unwrap();

    store
        .insert_order(OrderStatus::Active, user_id)
        .await
        .unwrap();
    store
        .insert_order(OrderStatus::Complete, user_id)
        .await
        .unwrap();
    store
        .insert_order(OrderStatus::Active, other.id)
        .await
        .unwrap();

    let all = store.list_orders_by_owner(user_id, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.windows(2).all(|w| w[0].id < w[1].id));

    let complete = store
        .list_orders_by_owner(user_id, Some(OrderStatus::Complete))
        .await
        .unwrap();
    assert_eq!(complete.len(), 1);
    assert_eq!(complete[0].status, OrderStatus::Complete);
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn duplicate_username_names_constraint() {
    let store = get_test_store().await;
    store.insert_user(new_user("jane")).await.unwrap();

    let mut duplicate = new_user("jane");
    duplicate.email = "other@example.com".to_string();
    let err = store.insert_user(duplicate).await.unwrap_err();

    assert!(matches!(err, StoreError::UniqueViolation { .. }));
    assert_eq!(err.constraint(), Some(constraints::USERS_USERNAME_KEY));

    let found = store.find_user_by_username("jane").await.unwrap().unwrap();
    assert_eq!(found.email, "jane@example.com");
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon"]
async fn product_update_and_category_filter() {
    let (store, _, product_id) = seeded().await;
    store
        .insert_product(new_product("Notebook", 399, Some("Stationery")))
        .await
        .unwrap();

    let updated = store
        .update_product(
            product_id,
            ProductUpdate {
                price: Some(Money::from_cents(4599).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Batteries");
    assert_eq!(updated.price.to_string(), "45.99");

    let electronics = store
        .list_products_by_category("Electronics")
        .await
        .unwrap();
    assert_eq!(electronics.len(), 1);
    assert_eq!(store.list_products().await.unwrap().len(), 2);
}
