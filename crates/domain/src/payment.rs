//! Payment handoff boundary.
//!
//! The checkout core does not talk to a real payment provider; it exposes
//! the single interface point where a created order becomes payable. A
//! gateway implementation must check [`OrderStatus::is_payable`] before
//! creating an intent — a cancelled or delivered order is never charged.
//! Success and failure reports come back through
//! [`OrderService::mark_paid`](crate::OrderService::mark_paid) and
//! [`OrderService::mark_payment_failed`](crate::OrderService::mark_payment_failed).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use store::Order;

use crate::error::{DomainError, Result};

/// A payment intent created for an order.
///
/// One order may accumulate several intents across retries; the gateway is
/// responsible for letting at most one reach a terminal succeeded state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// The intent id assigned by the gateway.
    pub intent_id: String,
    pub order_id: OrderId,
    pub amount: Money,
}

/// Trait for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for an order.
    ///
    /// Fails with `Conflict` if the order is not payable in its current
    /// status or the gateway rejects the request.
    async fn create_intent(&self, order: &Order) -> Result<PaymentIntent>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline the next intent.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of intents created.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns true if an intent exists with the given id.
    pub fn has_intent(&self, intent_id: &str) -> bool {
        self.state.read().unwrap().intents.contains_key(intent_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_intent(&self, order: &Order) -> Result<PaymentIntent> {
        if !order.status.is_payable() {
            return Err(DomainError::Conflict(format!(
                "order {} is not payable in status {}",
                order.id, order.status
            )));
        }

        let mut state = self.state.write().unwrap();
        if state.fail_on_create {
            return Err(DomainError::Conflict("payment declined".to_string()));
        }

        state.next_id += 1;
        let intent_id = format!("PI-{:04}", state.next_id);
        state
            .intents
            .insert(intent_id.clone(), (order.id, order.total));

        Ok(PaymentIntent {
            intent_id,
            order_id: order.id,
            amount: order.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{OrderStatus, UserId};
    use store::ShippingAddress;

    fn order_in(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            user_id: UserId::new(),
            items: Vec::new(),
            shipping_address: ShippingAddress {
                street: "123 Test St".to_string(),
                city: "Test City".to_string(),
                state: "TS".to_string(),
                postal_code: "12345".to_string(),
                country: "Testland".to_string(),
            },
            status,
            total: Money::from_cents(5000),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_intent_for_payable_order() {
        let gateway = InMemoryPaymentGateway::new();
        let order = order_in(OrderStatus::Pending);

        let intent = gateway.create_intent(&order).await.unwrap();
        assert!(intent.intent_id.starts_with("PI-"));
        assert_eq!(intent.amount.cents(), 5000);
        assert!(gateway.has_intent(&intent.intent_id));
    }

    #[tokio::test]
    async fn test_cancelled_order_is_never_charged() {
        let gateway = InMemoryPaymentGateway::new();
        let order = order_in(OrderStatus::Cancelled);

        let err = gateway.create_intent(&order).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(gateway.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_declined_intent() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_create(true);

        let err = gateway
            .create_intent(&order_in(OrderStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(gateway.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_intent_ids() {
        let gateway = InMemoryPaymentGateway::new();
        let i1 = gateway
            .create_intent(&order_in(OrderStatus::Pending))
            .await
            .unwrap();
        let i2 = gateway
            .create_intent(&order_in(OrderStatus::Processing))
            .await
            .unwrap();
        assert_eq!(i1.intent_id, "PI-0001");
        assert_eq!(i2.intent_id, "PI-0002");
    }
}
