//! Names of the integrity constraints declared in `migrations/`.
//!
//! The in-memory store reports violations under the same names so callers can
//! classify failures without knowing which backend produced them.

pub const USERS_USERNAME_KEY: &str = "users_username_key";
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const ORDERS_USER_ID_FKEY: &str = "orders_user_id_fkey";
pub const ORDER_PRODUCTS_ORDER_ID_FKEY: &str = "order_products_order_id_fkey";
pub const ORDER_PRODUCTS_PRODUCT_ID_FKEY: &str = "order_products_product_id_fkey";
pub const ORDER_PRODUCTS_QUANTITY_CHECK: &str = "order_products_quantity_check";
pub const PRODUCTS_PRICE_CHECK: &str = "products_price_cents_check";
