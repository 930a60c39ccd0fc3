//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ProductId;
use serde::Deserialize;
use serde_json::Value;
use store::{NewProduct, Product, ProductUpdate, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::input::{ApiJson, parse_id, parse_price, required, text};

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

/// Body of both create and update. Every field is optional on update.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: Option<Value>,
    pub price: Option<Value>,
    pub category: Option<Value>,
    pub description: Option<Value>,
}

/// GET /products, optionally `?category=`
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let products = match category {
        Some(category) => state.products.list_products_by_category(category).await?,
        None => state.products.list_products().await?,
    };
    Ok(Json(products))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.products.get_product(product_id).await?))
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let name = required(req.name.as_ref(), "name")?;
    let price = parse_price(&required(req.price.as_ref(), "price")?)?;

    let product = state
        .products
        .create_product(NewProduct {
            name,
            price,
            category: text(req.category.as_ref()),
            description: text(req.description.as_ref()),
        })
        .await?;
    Ok(Json(product))
}

/// PUT /products/{id} — partial update; absent fields are left unchanged.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    let price = text(req.price.as_ref())
        .map(|raw| parse_price(&raw))
        .transpose()?;

    let update = ProductUpdate {
        name: text(req.name.as_ref()),
        price,
        category: text(req.category.as_ref()),
        description: text(req.description.as_ref()),
    };
    Ok(Json(state.products.update_product(product_id, update).await?))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id(&id, "product id")?;
    Ok(Json(state.products.delete_product(product_id).await?))
}
