//! Business core of the checkout workflow.
//!
//! This crate owns the behavior that keeps carts, orders, and product stock
//! consistent:
//! - [`CartService`] — the per-user cart aggregate
//! - [`OrderService`] — order creation, lifecycle transitions, and the
//!   payment handoff entry points
//! - [`CatalogService`] — administrative product and stock management
//! - [`Actor`] / [`Access`] — the authorization predicate evaluated once per
//!   operation
//!
//! Services are generic over the storage traits in the `store` crate, so the
//! same logic runs against the in-memory store in tests and PostgreSQL in
//! production.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod payment;

pub use auth::{Access, Actor, Role};
pub use cart::{CartService, GuestCartLine};
pub use catalog::{CatalogService, StockAdjustment};
pub use error::{DomainError, Result};
pub use order::{CheckoutSource, OrderLineRequest, OrderService};
pub use payment::{InMemoryPaymentGateway, PaymentGateway, PaymentIntent};
