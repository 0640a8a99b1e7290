//! Administrative catalog management.

use common::ProductId;
use serde::{Deserialize, Serialize};
use store::{CatalogStore, NewProduct, Product};

use crate::auth::Actor;
use crate::error::{DomainError, Result};

/// A signed stock adjustment applied by an administrator.
///
/// Decreases go through the same conditional primitive as checkout, so an
/// adjustment below zero fails with `InsufficientStock` instead of driving
/// the counter negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustment {
    Increase(u32),
    Decrease(u32),
}

/// Service for administrative product and stock management.
pub struct CatalogService<S> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a product. Admin only.
    #[tracing::instrument(skip(self, product))]
    pub async fn create_product(&self, actor: Actor, product: NewProduct) -> Result<Product> {
        actor.admin_access().require("product", String::new())?;

        if product.name.trim().is_empty() {
            return Err(DomainError::InvalidRequest(
                "product name must not be empty".to_string(),
            ));
        }
        if !product.price.is_positive() {
            return Err(DomainError::InvalidRequest(
                "product price must be positive".to_string(),
            ));
        }

        Ok(self.store.insert_product(product).await?)
    }

    /// Loads a product by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "product",
                id: id.to_string(),
            })
    }

    /// Applies a stock adjustment. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        actor: Actor,
        id: ProductId,
        adjustment: StockAdjustment,
    ) -> Result<Product> {
        actor.admin_access().require("product", id.to_string())?;

        let product = match adjustment {
            StockAdjustment::Increase(amount) => self.store.increment_stock(id, amount).await?,
            StockAdjustment::Decrease(amount) => self.store.decrement_stock(id, amount).await?,
        };
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, UserId};
    use store::MemoryStore;

    fn widget(stock: u32) -> NewProduct {
        NewProduct {
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            stock,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_product_requires_admin() {
        let service = CatalogService::new(MemoryStore::new());

        let err = service
            .create_product(Actor::customer(UserId::new()), widget(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let product = service
            .create_product(Actor::admin(UserId::new()), widget(5))
            .await
            .unwrap();
        assert_eq!(product.stock, 5);
    }

    #[tokio::test]
    async fn test_create_product_validates_fields() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Actor::admin(UserId::new());

        let err = service
            .create_product(
                admin,
                NewProduct {
                    name: "  ".to_string(),
                    price: Money::from_cents(1000),
                    stock: 1,
                    is_active: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));

        let err = service
            .create_product(
                admin,
                NewProduct {
                    name: "Widget".to_string(),
                    price: Money::zero(),
                    stock: 1,
                    is_active: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_adjust_stock_round_trip() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Actor::admin(UserId::new());
        let product = service.create_product(admin, widget(5)).await.unwrap();

        let product = service
            .adjust_stock(admin, product.id, StockAdjustment::Increase(10))
            .await
            .unwrap();
        assert_eq!(product.stock, 15);

        let product = service
            .adjust_stock(admin, product.id, StockAdjustment::Decrease(15))
            .await
            .unwrap();
        assert_eq!(product.stock, 0);

        let err = service
            .adjust_stock(admin, product.id, StockAdjustment::Decrease(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_requires_admin() {
        let service = CatalogService::new(MemoryStore::new());
        let admin = Actor::admin(UserId::new());
        let product = service.create_product(admin, widget(5)).await.unwrap();

        let err = service
            .adjust_stock(
                Actor::customer(UserId::new()),
                product.id,
                StockAdjustment::Increase(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
