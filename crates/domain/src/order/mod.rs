//! Order creation and lifecycle.

mod builder;
mod service;

pub use builder::{CheckoutSource, OrderLineRequest};
pub use service::OrderService;
