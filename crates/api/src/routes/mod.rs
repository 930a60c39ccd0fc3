//! HTTP handlers, one module per resource.

pub mod line_items;
pub mod orders;
pub mod products;
pub mod system;
pub mod users;
