//! Order service: creation, lifecycle transitions, and the payment handoff
//! entry points.

use std::time::Instant;

use common::{OrderId, OrderStatus, UserId};
use store::{CartStore, CatalogStore, Order, OrderFilter, OrderStore, Page, ShippingAddress};

use crate::auth::Actor;
use crate::error::{DomainError, Result};

use super::builder::{self, CheckoutSource};

/// Upper bound on the page size of order listings.
const MAX_PAGE_SIZE: u32 = 100;

/// Service for creating orders and driving their lifecycle.
///
/// Creation decrements stock and persists the snapshot in one transaction;
/// a transition into `CANCELLED` restocks every line in one transaction.
/// Hard deletes never restock.
pub struct OrderService<S> {
    store: S,
}

impl<S: CatalogStore + CartStore + OrderStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order for the authenticated user.
    ///
    /// The checkout source is either the user's persisted cart (which is
    /// cleared inside the creation transaction) or an explicit item list.
    /// Unit prices are snapshotted from the catalog at this instant.
    #[tracing::instrument(skip(self, source, shipping_address))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        source: CheckoutSource,
        shipping_address: ShippingAddress,
    ) -> Result<Order> {
        let start = Instant::now();

        let new_order = builder::build_order(&self.store, user_id, source, shipping_address).await?;
        let order = self
            .store
            .create_order(new_order)
            .await
            .map_err(DomainError::from)
            .inspect_err(|e| {
                if matches!(e, DomainError::InsufficientStock { .. }) {
                    metrics::counter!("insufficient_stock_total").increment(1);
                }
            })?;

        metrics::counter!("orders_created_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, total = %order.total, "order created");

        Ok(order)
    }

    /// Loads an order, scoped to its owner unless the actor is an admin.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, actor: Actor, order_id: OrderId) -> Result<Order> {
        self.load_scoped(actor, order_id).await
    }

    /// Lists the actor's own orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, actor: Actor, filter: OrderFilter) -> Result<Page<Order>> {
        validate_filter(&filter)?;
        Ok(self
            .store
            .list_orders(Some(actor.user_id), filter)
            .await?)
    }

    /// Lists all orders across users. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, actor: Actor, filter: OrderFilter) -> Result<Page<Order>> {
        actor.admin_access().require("order", String::new())?;
        validate_filter(&filter)?;
        Ok(self.store.list_orders(None, filter).await?)
    }

    /// Transitions an order to a target status.
    ///
    /// A transition into `CANCELLED` restocks every line atomically with the
    /// status write. Any other allowed transition is a plain status write.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        actor: Actor,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order> {
        let order = self.load_scoped(actor, order_id).await?;
        self.transition(order, target).await
    }

    /// Hard-deletes an order.
    ///
    /// Deliberately does not restock, whatever the order's status: deletion
    /// is an administrative erasure, and the business reversal is the
    /// `CANCELLED` transition.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, actor: Actor, order_id: OrderId) -> Result<()> {
        let order = self.load_scoped(actor, order_id).await?;
        Ok(self.store.delete_order(order.id).await?)
    }

    /// Returns true if a payment intent may be created for this order.
    ///
    /// Consulted by the payment handoff before talking to the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn is_payable(&self, order_id: OrderId) -> Result<bool> {
        let order = self.load_unscoped(order_id).await?;
        Ok(order.status.is_payable())
    }

    /// Records a successful payment: `PENDING -> PROCESSING`.
    ///
    /// Internal entry point for the payment handoff, not reachable through
    /// the user-facing update operation's scoping.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load_unscoped(order_id).await?;
        self.transition(order, OrderStatus::Processing).await
    }

    /// Records a failed payment: cancels the order and restocks its lines.
    #[tracing::instrument(skip(self))]
    pub async fn mark_payment_failed(&self, order_id: OrderId) -> Result<Order> {
        let order = self.load_unscoped(order_id).await?;
        self.transition(order, OrderStatus::Cancelled).await
    }

    async fn transition(&self, order: Order, target: OrderStatus) -> Result<Order> {
        if !order.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        let restock = if target == OrderStatus::Cancelled {
            order.restock_lines()
        } else {
            Vec::new()
        };
        let updated = self.store.update_status(order.id, target, &restock).await?;

        if target == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        tracing::info!(order_id = %updated.id, status = %updated.status, "order transitioned");

        Ok(updated)
    }

    async fn load_scoped(&self, actor: Actor, order_id: OrderId) -> Result<Order> {
        let order = self.load_unscoped(order_id).await?;
        actor
            .access_to(order.user_id)
            .require("order", order_id.to_string())?;
        Ok(order)
    }

    async fn load_unscoped(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "order",
                id: order_id.to_string(),
            })
    }
}

fn validate_filter(filter: &OrderFilter) -> Result<()> {
    if filter.page == 0 {
        return Err(DomainError::InvalidRequest(
            "page must be at least 1".to_string(),
        ));
    }
    if filter.limit == 0 || filter.limit > MAX_PAGE_SIZE {
        return Err(DomainError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok(())
}
