//! Catalog administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Money, ProductId};
use domain::StockAdjustment;
use serde::{Deserialize, Serialize};
use store::{NewProduct, Product};

use crate::error::ApiError;
use crate::extract::Identity;
use crate::{AppState, Backend};

// -- Request types --

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub price_cents: i64,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
            is_active: product.is_active,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

// -- Handlers --

/// POST /products — creates a catalog product. Admin only.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .catalog_service
        .create_product(
            actor,
            NewProduct {
                name: req.name,
                price: Money::from_cents(req.price_cents),
                stock: req.stock,
                is_active: req.is_active,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{id} — loads one product.
#[tracing::instrument(skip(state))]
pub async fn get<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.catalog_service.get_product(product_id).await?;
    Ok(Json(product.into()))
}

/// POST /products/{id}/stock — applies a signed stock adjustment. Admin only.
///
/// Body is the adjustment, e.g. `{"increase": 5}` or `{"decrease": 3}`; a
/// decrease below zero fails with `INSUFFICIENT_STOCK`.
#[tracing::instrument(skip(state, adjustment))]
pub async fn adjust_stock<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(product_id): Path<ProductId>,
    Json(adjustment): Json<StockAdjustment>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .catalog_service
        .adjust_stock(actor, product_id, adjustment)
        .await?;
    Ok(Json(product.into()))
}
