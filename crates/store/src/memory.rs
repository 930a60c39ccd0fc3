use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, OrderStatus, ProductId, Quantity, UserId};
use tokio::sync::RwLock;

use crate::constraints;
use crate::store::{LineItemRepository, OrderRepository, ProductRepository, UserRepository};
use crate::{
    NewProduct, NewUser, Order, OrderLineItem, Product, ProductUpdate, Result, StoreError, User,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    line_items: Vec<OrderLineItem>,
    user_seq: i32,
    product_seq: i32,
    order_seq: i32,
}

impl Tables {
    fn line_item_position(&self, order_id: OrderId, product_id: ProductId) -> Option<usize> {
        self.line_items
            .iter()
            .position(|item| item.order_id == order_id && item.product_id == product_id)
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

/// In-memory store for tests and database-less runs.
///
/// Emulates the integrity constraints of the PostgreSQL schema, reporting
/// violations under the same constraint names. Every method holds the table
/// lock for its whole duration, so each call is atomic.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, status: OrderStatus, owner_id: UserId) -> Result<Order> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(foreign_key(constraints::ORDERS_USER_ID_FKEY));
        }

        tables.order_seq += 1;
        let order = Order {
            id: OrderId::new(tables.order_seq),
            status,
            owner_id,
        };
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn list_orders_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.owner_id == owner_id)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.get_mut(&id).map(|order| {
            order.status = status;
            order.clone()
        }))
    }

    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        if tables.line_items.iter().any(|item| item.order_id == id) {
            return Err(foreign_key(constraints::ORDER_PRODUCTS_ORDER_ID_FKEY));
        }
        Ok(tables.orders.remove(&id))
    }
}

#[async_trait]
impl LineItemRepository for InMemoryStore {
    async fn list_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .line_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn merge_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<OrderLineItem> {
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&order_id) {
            return Err(foreign_key(constraints::ORDER_PRODUCTS_ORDER_ID_FKEY));
        }
        if !tables.products.contains_key(&product_id) {
            return Err(foreign_key(constraints::ORDER_PRODUCTS_PRODUCT_ID_FKEY));
        }

        match tables.line_item_position(order_id, product_id) {
            Some(pos) => {
                let item = &mut tables.line_items[pos];
                item.quantity = item
                    .quantity
                    .checked_add(quantity)
                    .map_err(|_| StoreError::QuantityOutOfRange)?;
                Ok(item.clone())
            }
            None => {
                let item = OrderLineItem {
                    order_id,
                    product_id,
                    quantity,
                };
                tables.line_items.push(item.clone());
                Ok(item)
            }
        }
    }

    async fn set_line_item_quantity(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Option<OrderLineItem>> {
        let mut tables = self.tables.write().await;
        Ok(match tables.line_item_position(order_id, product_id) {
            Some(pos) => {
                let item = &mut tables.line_items[pos];
                item.quantity = quantity;
                Some(item.clone())
            }
            None => None,
        })
    }

    async fn delete_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<OrderLineItem>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .line_item_position(order_id, product_id)
            .map(|pos| tables.line_items.remove(pos)))
    }

    async fn delete_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        let mut tables = self.tables.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.line_items)
            .into_iter()
            .partition(|item| item.order_id == order_id);
        tables.line_items = kept;
        Ok(removed)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(unique(constraints::USERS_USERNAME_KEY));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(unique(constraints::USERS_EMAIL_KEY));
        }

        tables.user_seq += 1;
        let user = User {
            id: UserId::new(tables.user_seq),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_digest: user.password_digest,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if tables.orders.values().any(|o| o.owner_id == id) {
            return Err(foreign_key(constraints::ORDERS_USER_ID_FKEY));
        }
        Ok(tables.users.remove(&id))
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;
        tables.product_seq += 1;
        let product = Product {
            id: ProductId::new(tables.product_seq),
            name: product.name,
            price: product.price,
            category: product.category,
            description: product.description,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn list_products_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.category.as_deref() == Some(category))
            .cloned()
            .collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        Ok(tables.products.get_mut(&id).map(|product| {
            update.apply(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        if tables.line_items.iter().any(|item| item.product_id == id) {
            return Err(foreign_key(constraints::ORDER_PRODUCTS_PRODUCT_ID_FKEY));
        }
        Ok(tables.products.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_digest: "digest".to_string(),
        }
    }

    fn new_product(name: &str, category: Option<&str>) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Money::from_cents(2000).unwrap(),
            category: category.map(str::to_string),
            description: None,
        }
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    async fn seeded() -> (InMemoryStore, UserId, ProductId) {
        let store = InMemoryStore::new();
        let user = store
            .insert_user(new_user("john_doe", "john@example.com"))
            .await
            .unwrap();
        let product = store
            .insert_product(new_product("Jump Rope", Some("Sporting Goods")))
            .await
            .unwrap();
        (store, user.id, product.id)
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially_from_one() {
        let (store, user_id, _) = seeded().await;

        let first = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();
        let second = store
            .insert_order(OrderStatus::Complete, user_id)
            .await
            .unwrap();

        assert_eq!(user_id, UserId::new(1));
        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(second.id, OrderId::new(2));
    }

    #[tokio::test]
    async fn insert_order_requires_existing_owner() {
        let store = InMemoryStore::new();
        let err = store
            .insert_order(OrderStatus::Active, UserId::new(99))
            .await
            .unwrap_err();

        assert_eq!(err.constraint(), Some(constraints::ORDERS_USER_ID_FKEY));
    }

    #[tokio::test]
    async fn merge_inserts_then_adds() {
        let (store, user_id, product_id) = seeded().await;
        let order = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();

        let first = store
            .merge_line_item(order.id, product_id, qty(20))
            .await
            .unwrap();
        assert_eq!(first.quantity.get(), 20);

        let merged = store
            .merge_line_item(order.id, product_id, qty(5))
            .await
            .unwrap();
        assert_eq!(merged.quantity.get(), 25);

        let items = store.list_line_items(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn merge_rejects_unknown_product() {
        let (store, user_id, _) = seeded().await;
        let order = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();

        let err = store
            .merge_line_item(order.id, ProductId::new(42), qty(1))
            .await
            .unwrap_err();
        assert_eq!(
            err.constraint(),
            Some(constraints::ORDER_PRODUCTS_PRODUCT_ID_FKEY)
        );
    }

    #[tokio::test]
    async fn merge_overflow_is_reported() {
        let (store, user_id, product_id) = seeded().await;
        let order = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();

        store
            .merge_line_item(order.id, product_id, qty(i64::from(i32::MAX)))
            .await
            .unwrap();
        let err = store
            .merge_line_item(order.id, product_id, qty(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::QuantityOutOfRange));
    }

    #[tokio::test]
    async fn delete_order_blocked_by_line_items() {
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
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

        store.delete_line_items(order.id).await.unwrap();
        assert_eq!(store.delete_order(order.id).await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn delete_line_items_only_touches_one_order() {
        let (store, user_id, product_id) = seeded().await;
        let a = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();
        let b = store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();
        store.merge_line_item(a.id, product_id, qty(1)).await.unwrap();
        store.merge_line_item(b.id, product_id, qty(2)).await.unwrap();

        let removed = store.delete_line_items(a.id).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(store.list_line_items(a.id).await.unwrap().is_empty());
        assert_eq!(store.list_line_items(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_orders_by_owner_filters_status() {
        let (store, user_id, _) = seeded().await;
        store
            .insert_order(OrderStatus::Active, user_id)
            .await
            .unwrap();
        store
            .insert_order(OrderStatus::Complete, user_id)
            .await
            .unwrap();

        let all = store.list_orders_by_owner(user_id, None).await.unwrap();
        let complete = store
            .list_orders_by_owner(user_id, Some(OrderStatus::Complete))
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0].id, OrderId::new(2));
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_rejected() {
        let (store, _, _) = seeded().await;

        let err = store
            .insert_user(new_user("john_doe", "other@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.constraint(), Some(constraints::USERS_USERNAME_KEY));

        let err = store
            .insert_user(new_user("jane", "john@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.constraint(), Some(constraints::USERS_EMAIL_KEY));
    }

    #[tokio::test]
    async fn products_filter_by_category() {
        let (store, _, _) = seeded().await;
        store
            .insert_product(new_product("Batteries", Some("Electronics")))
            .await
            .unwrap();
        store
            .insert_product(new_product("Mystery Box", None))
            .await
            .unwrap();

        let electronics = store.list_products_by_category("Electronics").await.unwrap();
        assert_eq!(electronics.len(), 1);
        assert_eq!(electronics[0].name, "Batteries");
        assert_eq!(store.list_products().await.unwrap().len(), 3);
    }
}
