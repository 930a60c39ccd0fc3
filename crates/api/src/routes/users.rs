//! User endpoints, sign-up/sign-in, and the per-user order views.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, State};
use common::{OrderStatus, UserId};
use domain::{OrderDetails, Registration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::{Order, Store, User};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::input::{ApiJson, parse_id, required};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<Value>,
    pub last_name: Option<Value>,
    pub username: Option<Value>,
    pub email: Option<Value>,
    pub password: Option<Value>,
}

#[derive(Deserialize)]
pub struct AuthenticateRequest {
    pub username: Option<Value>,
    pub password: Option<Value>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Handlers --

/// POST /users — sign up and receive a bearer token.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let registration = Registration {
        first_name: required(req.first_name.as_ref(), "first_name")?,
        last_name: required(req.last_name.as_ref(), "last_name")?,
        username: required(req.username.as_ref(), "username")?,
        email: required(req.email.as_ref(), "email")?,
        password: required(req.password.as_ref(), "password")?,
    };

    let user = state.users.create_user(registration).await?;
    let token = state.sessions.issue(user.id).await;
    Ok(Json(TokenResponse { token }))
}

/// POST /users/authenticate — sign in and receive a bearer token.
#[tracing::instrument(skip(state, req))]
pub async fn authenticate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<AuthenticateRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = required(req.username.as_ref(), "username")?;
    let password = required(req.password.as_ref(), "password")?;

    let user = state
        .users
        .authenticate(&username, &password)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {username} not found.")))?;

    let token = state.sessions.issue(user.id).await;
    Ok(Json(TokenResponse { token }))
}

/// GET /users
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list_users().await?))
}

/// GET /users/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id: UserId = parse_id(&id, "user id")?;
    Ok(Json(state.users.get_user(user_id).await?))
}

/// DELETE /users/{id} — also revokes the user's tokens.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Extension(AuthUser(caller)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id: UserId = parse_id(&id, "user id")?;
    let user = state.users.delete_user(user_id).await?;
    state.sessions.revoke_user(user_id).await;
    tracing::info!(%caller, %user_id, "user deleted");
    Ok(Json(user))
}

async fn owner_orders<S: Store>(
    state: &AppState<S>,
    id: &str,
    status: Option<OrderStatus>,
) -> Result<Vec<OrderDetails>, ApiError> {
    let owner_id: UserId = parse_id(id, "user id")?;
    state.users.get_user(owner_id).await?;
    Ok(state.orders.list_orders_for_owner(owner_id, status).await?)
}

async fn delete_owner_orders<S: Store>(
    state: &AppState<S>,
    id: &str,
    status: Option<OrderStatus>,
) -> Result<Vec<Order>, ApiError> {
    let owner_id: UserId = parse_id(id, "user id")?;
    state.users.get_user(owner_id).await?;
    Ok(state.orders.delete_orders_for_owner(owner_id, status).await?)
}

/// GET /users/{id}/orders
#[tracing::instrument(skip(state))]
pub async fn list_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    owner_orders(&state, &id, None).await.map(Json)
}

/// GET /users/{id}/orders/active
#[tracing::instrument(skip(state))]
pub async fn list_active_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    owner_orders(&state, &id, Some(OrderStatus::Active))
        .await
        .map(Json)
}

/// GET /users/{id}/orders/complete
#[tracing::instrument(skip(state))]
pub async fn list_complete_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<OrderDetails>>, ApiError> {
    owner_orders(&state, &id, Some(OrderStatus::Complete))
        .await
        .map(Json)
}

/// DELETE /users/{id}/orders
#[tracing::instrument(skip(state))]
pub async fn delete_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    delete_owner_orders(&state, &id, None).await.map(Json)
}

/// DELETE /users/{id}/orders/active
#[tracing::instrument(skip(state))]
pub async fn delete_active_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    delete_owner_orders(&state, &id, Some(OrderStatus::Active))
        .await
        .map(Json)
}

/// DELETE /users/{id}/orders/complete
#[tracing::instrument(skip(state))]
pub async fn delete_complete_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
    delete_owner_orders(&state, &id, Some(OrderStatus::Complete))
        .await
        .map(Json)
}
