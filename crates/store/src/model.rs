//! Persisted record types.

use chrono::{DateTime, Utc};
use common::{CartItemId, Money, OrderId, OrderStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A catalog product with its stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if the product can currently be ordered at all.
    pub fn is_orderable(&self) -> bool {
        self.is_active && self.stock > 0
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub is_active: bool,
}

/// A single line in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A user's cart: the mutable working set of intended purchases.
///
/// One cart per user, created lazily. Lines are unique per product; adding a
/// product that is already present increments the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Returns the line for a product, if present.
    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Shipping address captured on the order at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// An immutable order line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    /// Product name at creation time; later renames do not touch the order.
    pub product_name: String,
    pub quantity: u32,
    /// Unit price at creation time; later price changes do not touch the order.
    pub unit_price: Money,
}

impl OrderItem {
    /// Returns `quantity × unit_price`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A persisted order snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the (product, quantity) pairs to restock on cancellation.
    pub fn restock_lines(&self) -> Vec<(ProductId, u32)> {
        self.items.iter().map(|i| (i.product_id, i.quantity)).collect()
    }
}

/// A validated order ready to be persisted.
///
/// Built by the order builder after price snapshotting and per-product
/// quantity aggregation; the store decrements stock for every line and
/// writes the order in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: ShippingAddress,
    pub total: Money,
    /// True when checkout was sourced from the persisted cart; the store
    /// clears the user's cart inside the creation transaction.
    pub clear_cart: bool,
}

/// A line of a [`NewOrder`]. At most one per product.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl NewOrderItem {
    /// Returns `quantity × unit_price`.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Pagination and status filter for order listings.
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: 10,
        }
    }
}

impl OrderFilter {
    /// Returns the row offset for this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
