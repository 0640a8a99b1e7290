use common::{CartItemId, OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The cart line does not exist in the caller's cart.
    #[error("cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    /// The order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional stock decrement failed at write time.
    ///
    /// Raised both when the requested quantity exceeds available stock and
    /// when a concurrent checkout won the race for the last units; callers
    /// cannot and need not distinguish the two.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A unique constraint was violated.
    #[error("duplicate {entity}: {detail}")]
    Duplicate { entity: &'static str, detail: String },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
