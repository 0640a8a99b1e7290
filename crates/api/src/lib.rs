//! HTTP API server with observability for the checkout core.
//!
//! Provides REST endpoints for cart management, checkout, order lifecycle
//! transitions, catalog administration, and the payment handoff, with
//! structured logging (tracing) and Prometheus metrics.
//!
//! Authentication itself lives outside this core: handlers receive the
//! caller's identity from the `x-user-id` / `x-user-role` headers the auth
//! layer injects (see [`extract::Identity`]).

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::{CartService, CatalogService, InMemoryPaymentGateway, OrderService, PaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CartStore, CatalogStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Everything the handlers need from a storage backend.
pub trait Backend: CatalogStore + CartStore + OrderStore + Clone + Send + Sync + 'static {}

impl<T> Backend for T where T: CatalogStore + CartStore + OrderStore + Clone + Send + Sync + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub cart_service: CartService<S>,
    pub order_service: OrderService<S>,
    pub catalog_service: CatalogService<S>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
}

/// Creates the application state over a storage backend, wired to the
/// in-memory payment gateway.
pub fn create_state<S: Backend>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart_service: CartService::new(store.clone()),
        order_service: OrderService::new(store.clone()),
        catalog_service: CatalogService::new(store),
        payment_gateway: Arc::new(InMemoryPaymentGateway::new()),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Backend>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            patch(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route("/cart/merge", post(routes::cart::merge::<S>))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>)
                .patch(routes::orders::update::<S>)
                .delete(routes::orders::delete::<S>),
        )
        .route("/orders/admin/all", get(routes::orders::list_all::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/products/{id}/stock",
            post(routes::products::adjust_stock::<S>),
        )
        .route("/payments/intents", post(routes::payment::create_intent::<S>))
        .route(
            "/payments/{order_id}/payable",
            get(routes::payment::payable::<S>),
        )
        .route(
            "/payments/{order_id}/succeeded",
            post(routes::payment::succeeded::<S>),
        )
        .route(
            "/payments/{order_id}/failed",
            post(routes::payment::failed::<S>),
        )
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
