use async_trait::async_trait;
use common::{OrderId, OrderStatus, ProductId, Quantity, UserId};

use crate::{NewProduct, NewUser, Order, OrderLineItem, Product, ProductUpdate, Result, User};

/// Persistence for the `orders` table.
///
/// Listing methods return rows in insertion order (ascending id).
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts an order and returns it with its assigned id.
    ///
    /// Fails with `ForeignKeyViolation` if `owner_id` does not reference a user.
    async fn insert_order(&self, status: OrderStatus, owner_id: UserId) -> Result<Order>;

    /// Fetches an order by id.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists every order.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists the orders of one owner, optionally restricted to a status.
    async fn list_orders_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;

    /// Overwrites the status of an order. Returns `None` if it does not exist.
    async fn update_order_status(&self, id: OrderId, status: OrderStatus)
    -> Result<Option<Order>>;

    /// Deletes an order row. Returns the deleted row, or `None` if it did not exist.
    ///
    /// Fails with `ForeignKeyViolation` while line items still reference it.
    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>>;
}

/// Persistence for the `order_products` table.
#[async_trait]
pub trait LineItemRepository: Send + Sync {
    /// Lists the line items of an order in insertion order.
    async fn list_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>>;

    /// Adds `quantity` to the existing line item, or inserts a new one.
    ///
    /// Performed as one atomic write, so concurrent merges for the same
    /// `(order_id, product_id)` never lose an update.
    async fn merge_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<OrderLineItem>;

    /// Replaces the quantity of an existing line item. Returns `None` if absent.
    async fn set_line_item_quantity(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Option<OrderLineItem>>;

    /// Deletes one line item. Returns it, or `None` if absent.
    async fn delete_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<OrderLineItem>>;

    /// Deletes every line item of an order and returns them.
    async fn delete_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>>;
}

/// Persistence for the `users` table.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Fails with `UniqueViolation` on a taken username or email.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Fetches a user by id.
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    /// Fetches a user by username.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Lists every user.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Deletes a user. Fails with `ForeignKeyViolation` while orders reference it.
    async fn delete_user(&self, id: UserId) -> Result<Option<User>>;
}

/// Persistence for the `products` table.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Inserts a product.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Fetches a product by id.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists every product.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Lists products of one category.
    async fn list_products_by_category(&self, category: &str) -> Result<Vec<Product>>;

    /// Applies a partial update. Returns `None` if the product does not exist.
    async fn update_product(&self, id: ProductId, update: ProductUpdate)
    -> Result<Option<Product>>;

    /// Deletes a product. Fails with `ForeignKeyViolation` while line items reference it.
    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>>;
}

/// A complete storage backend.
pub trait Store:
    OrderRepository + LineItemRepository + UserRepository + ProductRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: OrderRepository + LineItemRepository + UserRepository + ProductRepository + Clone + 'static
{
}
