use std::time::Duration;

use async_trait::async_trait;
use common::{Money, OrderId, OrderStatus, ProductId, Quantity, UserId};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::store::{LineItemRepository, OrderRepository, ProductRepository, UserRepository};
use crate::{
    NewProduct, NewUser, Order, OrderLineItem, Product, ProductUpdate, Result, StoreError, User,
};

/// SQLSTATE raised when an integer column overflows.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Empties every table and restarts the id sequences at 1.
    pub async fn truncate_all(&self) -> Result<()> {
        sqlx::query(
            "TRUNCATE TABLE order_products, orders, products, users RESTART IDENTITY CASCADE",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            id: OrderId::new(row.try_get("id")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            owner_id: UserId::new(row.try_get("user_id")?),
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<OrderLineItem> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(OrderLineItem {
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: Quantity::try_from(quantity)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_digest: row.try_get("password_digest")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let price_cents: i64 = row.try_get("price_cents")?;
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(price_cents).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
        })
    }
}

/// Classifies constraint failures so callers can tell them apart from
/// connectivity problems.
fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let constraint = db_err.constraint().unwrap_or_default().to_string();
        match db_err.kind() {
            ErrorKind::UniqueViolation => return StoreError::UniqueViolation { constraint },
            ErrorKind::ForeignKeyViolation => {
                return StoreError::ForeignKeyViolation { constraint };
            }
            ErrorKind::CheckViolation => return StoreError::CheckViolation { constraint },
            _ => {}
        }
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return StoreError::QuantityOutOfRange;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, status: OrderStatus, owner_id: UserId) -> Result<Order> {
        let row = sqlx::query(
            "INSERT INTO orders (status, user_id) VALUES ($1, $2) RETURNING id, status, user_id",
        )
        .bind(status.as_str())
        .bind(owner_id.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_order(row)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query("SELECT id, status, user_id FROM orders WHERE id = $1")
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_order)
            .transpose()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query("SELECT id, status, user_id FROM orders ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_orders_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, user_id
            FROM orders
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY id ASC
            "#,
        )
        .bind(owner_id.as_i32())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 RETURNING id, status, user_id")
            .bind(id.as_i32())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Self::row_to_order)
            .transpose()
    }

    async fn delete_order(&self, id: OrderId) -> Result<Option<Order>> {
        sqlx::query("DELETE FROM orders WHERE id = $1 RETURNING id, status, user_id")
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .map(Self::row_to_order)
            .transpose()
    }
}

#[async_trait]
impl LineItemRepository for PostgresStore {
    async fn list_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity
            FROM order_products
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn merge_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<OrderLineItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO order_products (order_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id, product_id)
            DO UPDATE SET quantity = order_products.quantity + EXCLUDED.quantity
            RETURNING order_id, product_id, quantity
            "#,
        )
        .bind(order_id.as_i32())
        .bind(product_id.as_i32())
        .bind(quantity.get())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_line_item(row)
    }

    async fn set_line_item_quantity(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Option<OrderLineItem>> {
        sqlx::query(
            r#"
            UPDATE order_products SET quantity = $3
            WHERE order_id = $1 AND product_id = $2
            RETURNING order_id, product_id, quantity
            "#,
        )
        .bind(order_id.as_i32())
        .bind(product_id.as_i32())
        .bind(quantity.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Self::row_to_line_item)
        .transpose()
    }

    async fn delete_line_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
    ) -> Result<Option<OrderLineItem>> {
        sqlx::query(
            r#"
            DELETE FROM order_products
            WHERE order_id = $1 AND product_id = $2
            RETURNING order_id, product_id, quantity
            "#,
        )
        .bind(order_id.as_i32())
        .bind(product_id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_line_item)
        .transpose()
    }

    async fn delete_line_items(&self, order_id: OrderId) -> Result<Vec<OrderLineItem>> {
        // RETURNING carries no ordering guarantee; sort by the surrogate key.
        let rows = sqlx::query(
            r#"
            WITH deleted AS (
                DELETE FROM order_products WHERE order_id = $1
                RETURNING id, order_id, product_id, quantity
            )
            SELECT order_id, product_id, quantity FROM deleted ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }
}

#[async_trait]
impl UserRepository for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, username, email, password_digest)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, username, email, password_digest
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_digest)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_user(row)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query(
            "SELECT id, first_name, last_name, username, email, password_digest FROM users WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_user)
        .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query(
            "SELECT id, first_name, last_name, username, email, password_digest FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_user)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, first_name, last_name, username, email, password_digest FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_user).collect()
    }

    async fn delete_user(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query(
            "DELETE FROM users WHERE id = $1 RETURNING id, first_name, last_name, username, email, password_digest",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Self::row_to_user)
        .transpose()
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, category, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, price_cents, category, description
            "#,
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(&product.category)
        .bind(&product.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::row_to_product(row)
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(
            "SELECT id, name, price_cents, category, description FROM products WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_product)
        .transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, price_cents, category, description FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn list_products_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, price_cents, category, description
            FROM products
            WHERE category = $1
            ORDER BY id ASC
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Option<Product>> {
        sqlx::query(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                price_cents = COALESCE($3, price_cents),
                category = COALESCE($4, category),
                description = COALESCE($5, description)
            WHERE id = $1
            RETURNING id, name, price_cents, category, description
            "#,
        )
        .bind(id.as_i32())
        .bind(&update.name)
        .bind(update.price.map(|p| p.cents()))
        .bind(&update.category)
        .bind(&update.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Self::row_to_product)
        .transpose()
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(
            "DELETE FROM products WHERE id = $1 RETURNING id, name, price_cents, category, description",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .map(Self::row_to_product)
        .transpose()
    }
}
