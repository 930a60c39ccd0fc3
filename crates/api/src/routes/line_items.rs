//! Line-item endpoints under `/orders/{id}/products`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, ProductId, Quantity};
use serde::Deserialize;
use serde_json::Value;
use store::{OrderLineItem, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::input::{ApiJson, parse_id, parse_quantity, required, text};

#[derive(Debug, Deserialize)]
pub struct AddLineItemRequest {
    pub product_id: Option<Value>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: Option<Value>,
}

fn parse_path(order_id: &str, product_id: &str) -> Result<(OrderId, ProductId), ApiError> {
    Ok((
        parse_id(order_id, "order id")?,
        parse_id(product_id, "product id")?,
    ))
}

/// GET /orders/{id}/products
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderLineItem>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    state.orders.get_order(order_id).await?;
    Ok(Json(state.orders.list_line_items(order_id).await?))
}

/// POST /orders/{id}/products — add a product, merging with an existing line.
///
/// `quantity` defaults to 1.
#[tracing::instrument(skip(state, req))]
pub async fn add<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddLineItemRequest>,
) -> Result<Json<OrderLineItem>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let product_id = required(req.product_id.as_ref(), "product_id")?;
    let product_id: ProductId = parse_id(&product_id, "product_id")?;
    let quantity = match text(req.quantity.as_ref()) {
        Some(raw) => parse_quantity(&raw)?,
        None => Quantity::ONE,
    };

    state.orders.get_order(order_id).await?;
    state.products.get_product(product_id).await?;
    let item = state
        .orders
        .add_line_item(order_id, product_id, quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /orders/{id}/products — remove every product from the order.
#[tracing::instrument(skip(state))]
pub async fn remove_all<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderLineItem>>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    state.orders.get_order(order_id).await?;
    Ok(Json(state.orders.remove_all_line_items(order_id).await?))
}

/// PUT /orders/{id}/products/{product_id} — replace the quantity.
#[tracing::instrument(skip(state, req))]
pub async fn set_quantity<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, product_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<SetQuantityRequest>,
) -> Result<Json<OrderLineItem>, ApiError> {
    let (order_id, product_id) = parse_path(&id, &product_id)?;
    let quantity = parse_quantity(&required(req.quantity.as_ref(), "quantity")?)?;

    let item = state
        .orders
        .set_line_item_quantity(order_id, product_id, quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /orders/{id}/products/{product_id}
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<OrderLineItem>, ApiError> {
    let (order_id, product_id) = parse_path(&id, &product_id)?;
    Ok(Json(
        state.orders.remove_line_item(order_id, product_id).await?,
    ))
}
