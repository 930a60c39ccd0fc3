//! Domain layer for the storefront.
//!
//! This crate provides the services that sit between the HTTP handlers and
//! the store:
//! - [`OrderService`]: orders, line items and their consistency rules
//! - [`UserService`]: registration and password authentication
//! - [`ProductService`]: the product catalog

pub mod error;
pub mod order;
pub mod product;
pub mod user;

pub use error::{ConstraintViolation, DomainError, Result};
pub use order::{OrderDetails, OrderProduct, OrderService};
pub use product::ProductService;
pub use user::{Registration, UserService};
