//! The unified error taxonomy of the checkout core.

use common::{OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the domain services.
///
/// Every failure maps to a stable machine-readable kind (see
/// [`DomainError::kind`]) plus a human-readable message. Storage races lost
/// at write time surface through the same taxonomy: a failed conditional
/// decrement is `InsufficientStock`, never a generic database error.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A product, cart item, or order is missing — or exists but must appear
    /// missing to the caller (ownership scoping never reveals existence).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requested quantity exceeds the stock available at write time.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The request is structurally invalid (empty item list, zero quantity).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The order status change is not allowed by the lifecycle.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The caller is authenticated but lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A storage fault that is none of the above.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    /// Returns the stable machine-readable kind of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::InvalidRequest(_) => "INVALID_REQUEST",
            DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::Conflict(_) => "CONFLICT",
            DomainError::Store(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProductNotFound(id) => DomainError::NotFound {
                entity: "product",
                id: id.to_string(),
            },
            StoreError::CartItemNotFound(id) => DomainError::NotFound {
                entity: "cart item",
                id: id.to_string(),
            },
            StoreError::OrderNotFound(id) => DomainError::NotFound {
                entity: "order",
                id: id.to_string(),
            },
            StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            } => DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::Duplicate { entity, detail } => {
                DomainError::Conflict(format!("duplicate {entity}: {detail}"))
            }
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
