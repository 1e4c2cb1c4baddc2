//! Order aggregate and related types.

mod aggregate;
mod changes;
pub mod reconcile;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use changes::{ChangeNotifier, OrderChange};
pub use reconcile::{EditPlan, PlannedLine, plan_edit};
pub use state::OrderStatus;
pub use value_objects::{
    LineRequest, Money, OrderItem, OrderMetadata, ShippingInfo, validate_lines,
};

use common::VariantKey;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request contains no lines.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A line asks for a non-positive quantity.
    #[error("Invalid quantity {quantity} for {key} (must be greater than 0)")]
    InvalidQuantity { key: VariantKey, quantity: u32 },

    /// The same variant appears on more than one line.
    #[error("Duplicate line for {key}")]
    DuplicateLine { key: VariantKey },

    /// A status string is not recognized.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    /// A status edit is not allowed from the current state.
    #[error("Invalid state transition: cannot move from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },

    /// Only pending orders can be cancelled.
    #[error("Only pending orders can be cancelled (order is {status})")]
    NotPending { status: OrderStatus },

    /// Items can only be changed while the order is pending.
    #[error("Items cannot be changed once the order is {status}")]
    ItemsLocked { status: OrderStatus },

    /// A persisted order document could not be decoded.
    #[error("Corrupt order document: {0}")]
    CorruptDocument(String),
}
