//! HTTP API server for the storefront.
//!
//! Provides REST endpoints for users, products, orders and order line items,
//! with bearer-token authentication, structured logging (tracing) and
//! Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod input;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use domain::{OrderService, ProductService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::SessionStore;
use config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub orders: OrderService<S>,
    pub users: UserService<S>,
    pub products: ProductService<S>,
    pub sessions: SessionStore,
}

impl<S: Store> AppState<S> {
    /// Builds the services over one store handle.
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            users: UserService::new(store.clone(), config.password_pepper.clone()),
            products: ProductService::new(store),
            sessions: SessionStore::new(config.session_ttl),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    use routes::{line_items, orders, products, system, users};

    let metrics_router = Router::new()
        .route("/metrics", get(system::metrics))
        .with_state(metrics_handle);

    let public = Router::new()
        .route("/health", get(system::health))
        .route("/users", post(users::create::<S>))
        .route("/users/authenticate", post(users::authenticate::<S>))
        .route("/products", get(products::list::<S>))
        .route("/products/{id}", get(products::get::<S>));

    let protected = Router::new()
        .route("/users", get(users::list::<S>))
        .route(
            "/users/{id}",
            get(users::get::<S>).delete(users::delete::<S>),
        )
        .route(
            "/users/{id}/orders",
            get(users::list_orders::<S>).delete(users::delete_orders::<S>),
        )
        .route(
            "/users/{id}/orders/active",
            get(users::list_active_orders::<S>).delete(users::delete_active_orders::<S>),
        )
        .route(
            "/users/{id}/orders/complete",
            get(users::list_complete_orders::<S>).delete(users::delete_complete_orders::<S>),
        )
        .route("/products", post(products::create::<S>))
        .route(
            "/products/{id}",
            put(products::update::<S>).delete(products::delete::<S>),
        )
        .route(
            "/orders",
            get(orders::list::<S>).post(orders::create::<S>),
        )
        .route("/orders/order-details", get(orders::list_details::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .put(orders::update_status::<S>)
                .delete(orders::delete::<S>),
        )
        .route("/orders/{id}/order-details", get(orders::details::<S>))
        .route(
            "/orders/{id}/products",
            get(line_items::list::<S>)
                .post(line_items::add::<S>)
                .delete(line_items::remove_all::<S>),
        )
        .route(
            "/orders/{id}/products/{product_id}",
            put(line_items::set_quantity::<S>).delete(line_items::remove::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            auth::require_auth,
        ));

    public
        .merge(protected)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
