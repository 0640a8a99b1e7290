//! Shared value types for the checkout core.

pub mod ids;
pub mod money;
pub mod status;

pub use ids::{CartItemId, OrderId, ProductId, UserId};
pub use money::Money;
pub use status::OrderStatus;
