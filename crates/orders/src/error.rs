//! Order service error types.

use common::{ColorId, ProductId, SizeId, VariantKey};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order protocols.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The request is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced order, product or variant does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The variant does not have enough stock for the request.
    #[error(
        "Insufficient stock for product {product_id} (size {size_id}, color {color_id}): requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        size_id: SizeId,
        color_id: ColorId,
        requested: u32,
        available: u32,
    },

    /// A concurrent request consumed the stock between the read and the
    /// conditional update.
    #[error(
        "Insufficient stock for product {product_id} (size {size_id}, color {color_id}): reserved concurrently"
    )]
    ConcurrencyConflict {
        product_id: ProductId,
        size_id: SizeId,
        color_id: ColorId,
    },

    /// The order is not in a state that allows the operation.
    #[error("{0}")]
    State(String),

    /// A persisted document could not be decoded or encoded.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl OrderServiceError {
    /// Creates an `InsufficientStock` error for a variant.
    pub fn insufficient(key: VariantKey, requested: u32, available: u32) -> Self {
        Self::InsufficientStock {
            product_id: key.product_id,
            size_id: key.size_id,
            color_id: key.color_id,
            requested,
            available,
        }
    }

    /// Creates a `ConcurrencyConflict` error for a variant.
    pub fn conflict(key: VariantKey) -> Self {
        Self::ConcurrencyConflict {
            product_id: key.product_id,
            size_id: key.size_id,
            color_id: key.color_id,
        }
    }

    /// Returns true for either kind of stock rejection.
    pub fn is_stock_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock { .. } | Self::ConcurrencyConflict { .. }
        )
    }

    /// Returns the offending variant of a stock rejection.
    pub fn variant(&self) -> Option<VariantKey> {
        match self {
            Self::InsufficientStock {
                product_id,
                size_id,
                color_id,
                ..
            }
            | Self::ConcurrencyConflict {
                product_id,
                size_id,
                color_id,
            } => Some(VariantKey::new(
                product_id.clone(),
                size_id.clone(),
                color_id.clone(),
            )),
            _ => None,
        }
    }

    /// Returns a short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::State(_) => "state",
            Self::Internal(_) => "internal",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for OrderServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConditionFailed {
                key,
                requested,
                available,
            } => Self::insufficient(key, requested, available),
            StoreError::VariantNotFound(key) => Self::NotFound(format!("variant {}", key)),
            StoreError::OrderNotFound(order_id) => Self::NotFound(format!("order {}", order_id)),
            StoreError::RevisionConflict { order_id, .. } => {
                Self::State(format!("order {} was modified concurrently", order_id))
            }
            other => Self::Store(other),
        }
    }
}

impl From<OrderError> for OrderServiceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity { .. }
            | OrderError::DuplicateLine { .. }
            | OrderError::InvalidStatus { .. } => Self::Validation(e.to_string()),
            OrderError::InvalidStateTransition { .. }
            | OrderError::NotPending { .. }
            | OrderError::ItemsLocked { .. } => Self::State(e.to_string()),
            OrderError::CorruptDocument(_) => Self::Internal(e.to_string()),
        }
    }
}

/// Convenience type alias for order service results.
pub type Result<T> = std::result::Result<T, OrderServiceError>;
