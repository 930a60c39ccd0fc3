//! Persistence layer for the storefront service.
//!
//! Repository traits describe the create/read/update/delete contract for each
//! table. Two implementations are provided: [`InMemoryStore`] for tests and
//! local runs, and [`PostgresStore`] backed by a `sqlx` connection pool.

pub mod constraints;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use common::{Money, OrderId, OrderStatus, ProductId, Quantity, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{NewProduct, NewUser, Order, OrderLineItem, Product, ProductUpdate, User};
pub use store::{LineItemRepository, OrderRepository, ProductRepository, Store, UserRepository};
