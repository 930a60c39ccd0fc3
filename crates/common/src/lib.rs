//! Shared types for the storefront service.
//!
//! Identifiers are thin newtypes over the integer keys the store assigns, so
//! an order id can never be passed where a product id is expected.

mod status;
mod types;
mod values;

pub use status::{OrderStatus, ParseStatusError};
pub use types::{OrderId, ProductId, UserId};
pub use values::{InvalidMoney, InvalidQuantity, Money, Quantity};
