use thiserror::Error;

use crate::{OrderId, Revision, VariantKey};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No variant exists for the given product/size/color.
    #[error("Variant not found: {0}")]
    VariantNotFound(VariantKey),

    /// A conditional decrement did not apply because stock was too low
    /// at the moment of the write.
    #[error("Stock condition failed for {key}: requested {requested}, available {available}")]
    ConditionFailed {
        key: VariantKey,
        requested: u32,
        available: u32,
    },

    /// The order document was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// An order document with this ID already exists.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order document changed since it was read.
    #[error("Revision conflict for order {order_id}: expected revision {expected}, found {actual}")]
    RevisionConflict {
        order_id: OrderId,
        expected: Revision,
        actual: Revision,
    },

    /// The backing store refused or dropped the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
