//! Orders and their line items.

mod details;
mod service;

pub use details::{OrderDetails, OrderProduct};
pub use service::OrderService;
