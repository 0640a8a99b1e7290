//! Checkout and order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, ProductId, UserId};
use domain::{CheckoutSource, OrderLineRequest};
use serde::{Deserialize, Serialize};
use store::{Order, OrderFilter, Page, ShippingAddress};

use crate::error::ApiError;
use crate::extract::Identity;
use crate::{AppState, Backend};

// -- Request types --

/// Checkout request. When `items` is omitted the order is built from the
/// caller's persisted cart, which is cleared in the same transaction.
#[derive(Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Option<Vec<OrderLineRequest>>,
    pub shipping_address: ShippingAddress,
}

#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    pub status: OrderStatus,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl From<ListOrdersQuery> for OrderFilter {
    fn from(query: ListOrdersQuery) -> Self {
        Self {
            status: query.status,
            page: query.page,
            limit: query.limit,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    product_name: i.product_name,
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price.cents(),
                })
                .collect(),
            shipping_address: order.shipping_address,
            total_cents: order.total.cents(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl From<Page<Order>> for PageResponse<OrderResponse> {
    fn from(page: Page<Order>) -> Self {
        Self {
            items: page.items.into_iter().map(OrderResponse::from).collect(),
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

// -- Handlers --

/// POST /orders — checks out the caller's cart or an explicit item list.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let source = match req.items {
        Some(items) => CheckoutSource::Items(items),
        None => CheckoutSource::Cart,
    };
    let order = state
        .order_service
        .create_order(actor.user_id, source, req.shipping_address)
        .await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — lists the caller's orders, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let page = state.order_service.list_orders(actor, query.into()).await?;
    Ok(Json(page.into()))
}

/// GET /admin/orders — lists orders across all users. Admin only.
#[tracing::instrument(skip(state, query))]
pub async fn list_all<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<PageResponse<OrderResponse>>, ApiError> {
    let page = state
        .order_service
        .list_all_orders(actor, query.into())
        .await?;
    Ok(Json(page.into()))
}

/// GET /orders/{id} — loads one order, scoped to its owner unless admin.
#[tracing::instrument(skip(state))]
pub async fn get<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.get_order(actor, order_id).await?;
    Ok(Json(order.into()))
}

/// PATCH /orders/{id} — transitions the order to a target status.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .order_service
        .update_order(actor, order_id, req.status)
        .await?;
    Ok(Json(order.into()))
}

/// DELETE /orders/{id} — hard-deletes the order without restocking.
#[tracing::instrument(skip(state))]
pub async fn delete<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
) -> Result<StatusCode, ApiError> {
    state.order_service.delete_order(actor, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
