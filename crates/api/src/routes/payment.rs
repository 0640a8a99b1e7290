//! Payment handoff endpoints.
//!
//! Intent creation is user-facing; the success and failure reports are the
//! gateway's internal entry points and require the administrator role the
//! auth layer grants to gateway callbacks.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::orders::OrderResponse;
use crate::error::ApiError;
use crate::extract::Identity;
use crate::{AppState, Backend};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: OrderId,
}

// -- Response types --

#[derive(Serialize)]
pub struct IntentResponse {
    pub intent_id: String,
    pub order_id: OrderId,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct PayableResponse {
    pub order_id: OrderId,
    pub payable: bool,
}

// -- Handlers --

/// POST /payments/intents — creates a payment intent for an order the
/// caller owns (or any order, for an admin).
#[tracing::instrument(skip(state, req))]
pub async fn create_intent<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Json(req): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<IntentResponse>), ApiError> {
    let order = state.order_service.get_order(actor, req.order_id).await?;
    let intent = state.payment_gateway.create_intent(&order).await?;
    Ok((
        StatusCode::CREATED,
        Json(IntentResponse {
            intent_id: intent.intent_id,
            order_id: intent.order_id,
            amount_cents: intent.amount.cents(),
        }),
    ))
}

/// GET /payments/{order_id}/payable — consulted before creating an intent.
#[tracing::instrument(skip(state))]
pub async fn payable<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
) -> Result<Json<PayableResponse>, ApiError> {
    actor.admin_access().require("order", order_id.to_string())?;
    let payable = state.order_service.is_payable(order_id).await?;
    Ok(Json(PayableResponse { order_id, payable }))
}

/// POST /payments/{order_id}/succeeded — records a successful payment.
#[tracing::instrument(skip(state))]
pub async fn succeeded<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    actor.admin_access().require("order", order_id.to_string())?;
    let order = state.order_service.mark_paid(order_id).await?;
    Ok(Json(order.into()))
}

/// POST /payments/{order_id}/failed — cancels the order and restocks.
#[tracing::instrument(skip(state))]
pub async fn failed<S: Backend>(
    State(state): State<Arc<AppState<S>>>,
    Identity(actor): Identity,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    actor.admin_access().require("order", order_id.to_string())?;
    let order = state.order_service.mark_payment_failed(order_id).await?;
    Ok(Json(order.into()))
}
