//! Cart endpoints.
//!
//! All operations are keyed by the authenticated caller; there is no way to
//! address another user's cart.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartItemId, ProductId, UserId};
use domain::GuestCartLine;
use serde::{Deserialize, Serialize};
use store::Cart;

use crate::error::ApiError;
use crate::extract::Identity;
use crate::{AppState, Backend};

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MergeCartRequest {
    pub items: Vec<GuestCartLine>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub user_id: UserId,
    pub items: Vec<CartItemResponse>,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            user_id: cart.user_id,
            items: cart
                .items
                .into_iter()
                .map(|i| CartItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// GET /cart — returns the caller's cart, creating it on first access.
#[tracing::instrument(skip(state))]
pub async fn get<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.get_or_create(actor.user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items — adds a product, summing with any existing line.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let cart = state
        .cart_service
        .add_item(actor.user_id, req.product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// PATCH /cart/items/{id} — replaces a line's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(item_id): Path<CartItemId>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .update_item(actor.user_id, item_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/{id} — removes a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .cart_service
        .remove_item(actor.user_id, item_id)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart — removes every line; idempotent.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.clear(actor.user_id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/merge — folds a guest cart into the caller's cart.
#[tracing::instrument(skip(state, req))]
pub async fn merge<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<MergeCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart_service.merge(actor.user_id, req.items).await?;
    Ok(Json(cart.into()))
}
