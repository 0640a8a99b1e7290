//! Persistence layer for the checkout core.
//!
//! Defines the storage traits the domain services are written against
//! ([`CatalogStore`], [`CartStore`], [`OrderStore`]), the persisted record
//! types, and two backends: an in-memory store for tests and local runs, and
//! a PostgreSQL store where stock decrements are conditional updates inside
//! the order-creation transaction.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{
    Cart, CartItem, NewOrder, NewOrderItem, NewProduct, Order, OrderFilter, OrderItem, Page,
    Product, ShippingAddress,
};
pub use postgres::PgStore;
pub use store::{CartStore, CatalogStore, OrderStore};
