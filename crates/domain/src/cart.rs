//! The per-user cart aggregate.

use std::collections::HashMap;

use common::{CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use store::{Cart, CartStore, CatalogStore, Product};

use crate::error::{DomainError, Result};

/// A line of a guest (pre-authentication) cart being merged into the user's
/// persisted cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Service managing the mutable per-user cart.
///
/// All operations are keyed by the authenticated user id. Stock checks at
/// this stage are advisory — they reject obviously impossible quantities
/// early, but nothing is reserved until checkout, where the store re-checks
/// at write time.
pub struct CartService<S> {
    store: S,
}

impl<S: CatalogStore + CartStore> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.store.get_or_create_cart(user_id).await?)
    }

    /// Adds a product to the cart.
    ///
    /// If the product is already in the cart the quantities are summed and
    /// the combined quantity is validated against current stock.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        validate_quantity(quantity)?;
        let product = self.load_orderable_product(product_id).await?;

        let cart = self.store.get_or_create_cart(user_id).await?;
        let in_cart = cart
            .item_for_product(product_id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        ensure_stock(&product, in_cart + quantity)?;

        Ok(self.store.upsert_item(user_id, product_id, quantity).await?)
    }

    /// Replaces the quantity of an existing cart line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart> {
        validate_quantity(quantity)?;
        let item = self
            .store
            .find_item(user_id, item_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "cart item",
                id: item_id.to_string(),
            })?;

        let product = self.load_orderable_product(item.product_id).await?;
        ensure_stock(&product, quantity)?;

        Ok(self
            .store
            .set_item_quantity(user_id, item_id, quantity)
            .await?)
    }

    /// Removes a line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        Ok(self.store.remove_item(user_id, item_id).await?)
    }

    /// Removes every line. Idempotent: an already-empty cart stays empty.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<Cart> {
        Ok(self.store.clear_cart(user_id).await?)
    }

    /// Folds a guest cart into the user's cart.
    ///
    /// Every incoming line is validated (product exists and is active, the
    /// combined quantity fits current stock) before anything is applied; one
    /// invalid line fails the whole merge.
    #[tracing::instrument(skip(self, incoming))]
    pub async fn merge(&self, user_id: UserId, incoming: Vec<GuestCartLine>) -> Result<Cart> {
        let cart = self.store.get_or_create_cart(user_id).await?;

        // Combined quantity per incoming product: what is already in the cart
        // plus everything the guest cart contributes.
        let mut combined: HashMap<ProductId, u32> = HashMap::new();
        for line in &incoming {
            validate_quantity(line.quantity)?;
            let entry = combined.entry(line.product_id).or_insert_with(|| {
                cart.item_for_product(line.product_id)
                    .map(|i| i.quantity)
                    .unwrap_or(0)
            });
            *entry += line.quantity;
        }

        for (&product_id, &total) in &combined {
            let product = self.load_orderable_product(product_id).await?;
            ensure_stock(&product, total)?;
        }

        // All lines validated; apply the additive upserts.
        let mut additions: HashMap<ProductId, u32> = HashMap::new();
        for line in incoming {
            *additions.entry(line.product_id).or_insert(0) += line.quantity;
        }
        let mut cart = cart;
        for (product_id, quantity) in additions {
            cart = self.store.upsert_item(user_id, product_id, quantity).await?;
        }
        Ok(cart)
    }

    /// Loads a product that can be put in a cart; missing and inactive
    /// products both read as not found.
    async fn load_orderable_product(&self, product_id: ProductId) -> Result<Product> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;
        if !product.is_active {
            return Err(DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            });
        }
        Ok(product)
    }
}

fn validate_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(DomainError::InvalidRequest(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn ensure_stock(product: &Product, requested: u32) -> Result<()> {
    if product.stock < requested {
        return Err(DomainError::InsufficientStock {
            product_id: product.id,
            requested,
            available: product.stock,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::{MemoryStore, NewProduct};

    async fn seed_product(store: &MemoryStore, stock: u32, is_active: bool) -> Product {
        store
            .insert_product(NewProduct {
                name: "Widget".to_string(),
                price: Money::from_cents(4999),
                stock,
                is_active,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let service = CartService::new(MemoryStore::new());
        let user = UserId::new();

        let first = service.get_or_create(user).await.unwrap();
        let second = service.get_or_create(user).await.unwrap();
        assert!(first.is_empty());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_add_item_sums_existing_quantity() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, product.id, 2).await.unwrap();
        let cart = service.add_item(user, product.id, 3).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_item_validates_combined_quantity_against_stock() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, product.id, 3).await.unwrap();
        let err = service.add_item(user, product.id, 3).await.unwrap_err();
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
    async fn test_add_item_zero_quantity_is_invalid_request() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5, true).await;
        let service = CartService::new(store);

        let err = service
            .add_item(UserId::new(), product.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_add_unknown_or_inactive_product_is_not_found() {
        let store = MemoryStore::new();
        let inactive = seed_product(&store, 5, false).await;
        let service = CartService::new(store);
        let user = UserId::new();

        let err = service
            .add_item(user, ProductId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "product", .. }));

        let err = service.add_item(user, inactive.id, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn test_update_item_replaces_quantity() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        let cart = service.add_item(user, product.id, 2).await.unwrap();
        let item_id = cart.items[0].id;

        let cart = service.update_item(user, item_id, 7).await.unwrap();
        assert_eq!(cart.items[0].quantity, 7);

        let err = service.update_item(user, item_id, 11).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn test_update_item_scoped_to_owner() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let owner = UserId::new();

        let cart = service.add_item(owner, product.id, 2).await.unwrap();
        let item_id = cart.items[0].id;

        let err = service
            .update_item(UserId::new(), item_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "cart item", .. }));
    }

    #[tokio::test]
    async fn test_add_then_remove_restores_item_count() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        let before = service.get_or_create(user).await.unwrap().items.len();
        let cart = service.add_item(user, product.id, 1).await.unwrap();
        let cart = service.remove_item(user, cart.items[0].id).await.unwrap();
        assert_eq!(cart.items.len(), before);
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_not_found() {
        let service = CartService::new(MemoryStore::new());
        let err = service
            .remove_item(UserId::new(), CartItemId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_clear_twice_is_idempotent() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, product.id, 2).await.unwrap();
        let cart = service.clear(user).await.unwrap();
        assert!(cart.is_empty());
        let cart = service.clear(user).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_merge_is_additive() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, product.id, 2).await.unwrap();
        let cart = service
            .merge(
                user,
                vec![GuestCartLine {
                    product_id: product.id,
                    quantity: 3,
                }],
            )
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_merge_rejects_whole_batch_on_one_bad_line() {
        let store = MemoryStore::new();
        let good = seed_product(&store, 10, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        let err = service
            .merge(
                user,
                vec![
                    GuestCartLine {
                        product_id: good.id,
                        quantity: 2,
                    },
                    GuestCartLine {
                        product_id: ProductId::new(),
                        quantity: 1,
                    },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        // Nothing was applied.
        let cart = service.get_or_create(user).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_merge_validates_summed_quantities() {
        let store = MemoryStore::new();
        let product = seed_product(&store, 5, true).await;
        let service = CartService::new(store);
        let user = UserId::new();

        service.add_item(user, product.id, 3).await.unwrap();
        let err = service
            .merge(
                user,
                vec![GuestCartLine {
                    product_id: product.id,
                    quantity: 3,
                }],
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
}
