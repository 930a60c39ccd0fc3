//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, UserId};
use domain::OrderDetails;
use serde::Deserialize;
use serde_json::Value;
use store::{Order, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::input::{ApiJson, parse_id, required};

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub status: Option<Value>,
    pub user_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<Value>,
}

// -- Handlers --

/// GET /orders
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders().await?))
}

/// GET /orders/order-details
#[tracing::instrument(skip(state))]
pub async fn list_details<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    Ok(Json(state.orders.list_order_details().await?))
}

/// POST /orders — create an order for an existing user.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    let status = required(req.status.as_ref(), "status")?;
    let user_id = required(req.user_id.as_ref(), "user_id")?;
    let owner_id: UserId = parse_id(&user_id, "user_id")?;

    state.users.get_user(owner_id).await?;
    let order = state.orders.create_order(&status, owner_id).await?;
    Ok(Json(order))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// PUT /orders/{id} — overwrite the status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let status = required(req.status.as_ref(), "status")?;
    Ok(Json(state.orders.update_status(order_id, &status).await?))
}

/// DELETE /orders/{id} — delete the order and its line items.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.delete_order(order_id).await?))
}

/// GET /orders/{id}/order-details
#[tracing::instrument(skip(state))]
pub async fn details<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.get_order_details(order_id).await?))
}
