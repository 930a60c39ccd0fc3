use common::{OrderId, OrderStatus, ProductId, Quantity, UserId};
use serde::Serialize;
use store::{Order, OrderLineItem};

/// A product and its quantity as listed inside [`OrderDetails`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderProduct {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// An order together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub order_id: OrderId,
    #[serde(rename = "user_id")]
    pub owner_id: UserId,
    pub status: OrderStatus,
    pub products: Vec<OrderProduct>,
}

impl OrderDetails {
    /// Composes the details view from an order row and its line items.
    pub fn new(order: &Order, line_items: Vec<OrderLineItem>) -> Self {
        Self {
            order_id: order.id,
            owner_id: order.owner_id,
            status: order.status,
            products: line_items
                .into_iter()
                .map(|item| OrderProduct {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}
