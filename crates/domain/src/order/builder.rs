//! The order builder: turns a checkout request into a validated,
//! price-snapshotted [`NewOrder`] ready to be persisted.

use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{CartStore, CatalogStore, NewOrder, NewOrderItem, ShippingAddress};

use crate::error::{DomainError, Result};

/// A checkout line as supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// The unit price the client observed, if any. Display-only: the server
    /// price at creation time is authoritative and is what gets snapshotted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
}

/// Where the checkout lines come from.
///
/// Both paths flow through the same builder so the stock-check logic cannot
/// diverge. A cart-sourced order clears the cart inside the creation
/// transaction; an explicit item list leaves the cart untouched.
#[derive(Debug, Clone)]
pub enum CheckoutSource {
    /// Check out the user's persisted cart.
    Cart,
    /// Check out an explicit list of lines.
    Items(Vec<OrderLineRequest>),
}

/// Validates the request and builds a [`NewOrder`].
///
/// Duplicate lines for the same product are aggregated before the stock
/// check, so a request whose lines sum past the available stock fails here
/// rather than slipping through line-by-line. The store re-checks every
/// decrement at write time regardless.
pub(crate) async fn build_order<S: CatalogStore + CartStore>(
    store: &S,
    user_id: UserId,
    source: CheckoutSource,
    shipping_address: ShippingAddress,
) -> Result<NewOrder> {
    let (lines, from_cart) = match source {
        CheckoutSource::Items(items) => (items, false),
        CheckoutSource::Cart => {
            let cart = store.get_or_create_cart(user_id).await?;
            let lines = cart
                .items
                .into_iter()
                .map(|i| OrderLineRequest {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: None,
                })
                .collect();
            (lines, true)
        }
    };

    if lines.is_empty() {
        return Err(DomainError::InvalidRequest(
            "order must contain at least one item".to_string(),
        ));
    }

    // Aggregate per-product quantities, keeping first-seen line order.
    let mut aggregated: Vec<(ProductId, u32)> = Vec::new();
    for line in &lines {
        if line.quantity == 0 {
            return Err(DomainError::InvalidRequest(
                "quantity must be at least 1".to_string(),
            ));
        }
        match aggregated.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, quantity)) => *quantity += line.quantity,
            None => aggregated.push((line.product_id, line.quantity)),
        }
    }

    let mut items = Vec::with_capacity(aggregated.len());
    for (product_id, quantity) in aggregated {
        let product = store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;

        // An inactive product reads as unavailable, not missing: the client
        // may legitimately hold a stale reference to it.
        if !product.is_active || product.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product_id,
                requested: quantity,
                available: if product.is_active { product.stock } else { 0 },
            });
        }

        items.push(NewOrderItem {
            product_id,
            product_name: product.name,
            quantity,
            unit_price: product.price,
        });
    }

    let total: Money = items.iter().map(NewOrderItem::line_total).sum();

    Ok(NewOrder {
        user_id,
        items,
        shipping_address,
        total,
        clear_cart: from_cart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, NewProduct, Product};

    async fn seed(store: &MemoryStore, price_cents: i64, stock: u32) -> Product {
        store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                price: Money::from_cents(price_cents),
                stock,
                is_active: true,
            })
            .await
            .unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "123 Test St".to_string(),
            city: "Test City".to_string(),
            state: "TS".to_string(),
            postal_code: "12345".to_string(),
            country: "Testland".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_item_list_is_invalid() {
        let store = MemoryStore::new();
        let err = build_order(
            &store,
            UserId::new(),
            CheckoutSource::Items(vec![]),
            address(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_server_price_wins_over_client_price() {
        let store = MemoryStore::new();
        let product = seed(&store, 7999, 10).await;

        let order = build_order(
            &store,
            UserId::new(),
            CheckoutSource::Items(vec![OrderLineRequest {
                product_id: product.id,
                quantity: 2,
                price: Some(Money::from_cents(1)),
            }]),
            address(),
        )
        .await
        .unwrap();

        assert_eq!(order.items[0].unit_price.cents(), 7999);
        assert_eq!(order.total.cents(), 15998);
    }

    #[tokio::test]
    async fn test_duplicate_lines_aggregate_before_stock_check() {
        let store = MemoryStore::new();
        let product = seed(&store, 1000, 5).await;

        let err = build_order(
            &store,
            UserId::new(),
            CheckoutSource::Items(vec![
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 3,
                    price: None,
                },
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 3,
                    price: None,
                },
            ]),
            address(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_lines_merge_into_one_item() {
        let store = MemoryStore::new();
        let product = seed(&store, 1000, 10).await;

        let order = build_order(
            &store,
            UserId::new(),
            CheckoutSource::Items(vec![
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 2,
                    price: None,
                },
                OrderLineRequest {
                    product_id: product.id,
                    quantity: 3,
                    price: None,
                },
            ]),
            address(),
        )
        .await
        .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 5);
        assert_eq!(order.total.cents(), 5000);
    }

    #[tokio::test]
    async fn test_cart_source_marks_cart_for_clearing() {
        let store = MemoryStore::new();
        let product = seed(&store, 1000, 10).await;
        let user = UserId::new();
        store.upsert_item(user, product.id, 3).await.unwrap();

        let order = build_order(&store, user, CheckoutSource::Cart, address())
            .await
            .unwrap();
        assert!(order.clear_cart);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);

        let order = build_order(
            &store,
            user,
            CheckoutSource::Items(vec![OrderLineRequest {
                product_id: product.id,
                quantity: 1,
                price: None,
            }]),
            address(),
        )
        .await
        .unwrap();
        assert!(!order.clear_cart);
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_is_invalid() {
        let store = MemoryStore::new();
        let err = build_order(&store, UserId::new(), CheckoutSource::Cart, address())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_inactive_product_reads_as_unavailable() {
        let store = MemoryStore::new();
        let product = store
            .insert_product(NewProduct {
                name: "Retired".to_string(),
                price: Money::from_cents(500),
                stock: 10,
                is_active: false,
            })
            .await
            .unwrap();

        let err = build_order(
            &store,
            UserId::new(),
            CheckoutSource::Items(vec![OrderLineRequest {
                product_id: product.id,
                quantity: 1,
                price: None,
            }]),
            address(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock { available: 0, .. }
        ));
    }
}
