use async_trait::async_trait;
use common::{CartItemId, OrderId, OrderStatus, ProductId, UserId};

use crate::model::{Cart, CartItem, NewOrder, NewProduct, Order, OrderFilter, Page, Product};
use crate::Result;

/// Catalog access and the race-safe stock primitives.
///
/// The checkout core never reads-then-writes stock: every stock mutation
/// goes through [`decrement_stock`](CatalogStore::decrement_stock) /
/// [`increment_stock`](CatalogStore::increment_stock), which re-check the
/// counter at write time.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product and returns the persisted record.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Loads a product by id. Returns `None` if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Conditionally subtracts `amount` from the product's stock.
    ///
    /// Fails with [`StoreError::InsufficientStock`](crate::StoreError) if the
    /// counter would go negative at write time.
    async fn decrement_stock(&self, id: ProductId, amount: u32) -> Result<Product>;

    /// Adds `amount` back onto the product's stock.
    async fn increment_stock(&self, id: ProductId, amount: u32) -> Result<Product>;
}

/// Per-user cart persistence.
///
/// Every mutation is a single atomic write against the user's cart, so two
/// concurrent adds of the same product sum their quantities instead of
/// losing one update.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's cart, creating an empty one on first access.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart>;

    /// Adds `quantity` of a product to the cart, summing with any existing
    /// line for the same product. Returns the updated cart.
    async fn upsert_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart>;

    /// Loads a single cart line, scoped to the owner's cart.
    async fn find_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Option<CartItem>>;

    /// Replaces the quantity of an existing line.
    ///
    /// Fails with [`StoreError::CartItemNotFound`](crate::StoreError) if the
    /// line is absent from the caller's cart.
    async fn set_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart>;

    /// Removes a line from the cart.
    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart>;

    /// Removes every line. Succeeds on an already-empty cart.
    async fn clear_cart(&self, user_id: UserId) -> Result<Cart>;
}

/// Order persistence with the transactional checkout contract.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists an order atomically.
    ///
    /// In one transaction: decrements stock for every line (conditional on
    /// `stock >= quantity` at write time), writes the order header and all
    /// lines, and clears the user's cart when the order was sourced from it.
    /// If any decrement fails nothing is persisted and the error is
    /// [`StoreError::InsufficientStock`](crate::StoreError).
    async fn create_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by id. Returns `None` if it does not exist.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders, newest first, optionally scoped to one user.
    async fn list_orders(&self, user_id: Option<UserId>, filter: OrderFilter)
        -> Result<Page<Order>>;

    /// Writes a new status, restocking the given lines in the same
    /// transaction (used for transitions into `CANCELLED`).
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        restock: &[(ProductId, u32)],
    ) -> Result<Order>;

    /// Hard-deletes an order and its lines. Does not touch stock.
    async fn delete_order(&self, id: OrderId) -> Result<()>;
}
