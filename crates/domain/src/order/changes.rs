//! Change notifications emitted after state-changing order operations.

use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// A committed change to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderChange {
    /// A new order was placed.
    Created { order_id: OrderId, user_id: UserId },

    /// Items or metadata of an order were edited.
    Edited { order_id: OrderId, user_id: UserId },

    /// An edit moved the order to a new status.
    StatusChanged {
        order_id: OrderId,
        user_id: UserId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// An order was cancelled and its stock restored.
    Cancelled { order_id: OrderId, user_id: UserId },
}

impl OrderChange {
    /// Returns the affected order.
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderChange::Created { order_id, .. }
            | OrderChange::Edited { order_id, .. }
            | OrderChange::StatusChanged { order_id, .. }
            | OrderChange::Cancelled { order_id, .. } => *order_id,
        }
    }

    /// Returns the owner of the affected order.
    pub fn user_id(&self) -> UserId {
        match self {
            OrderChange::Created { user_id, .. }
            | OrderChange::Edited { user_id, .. }
            | OrderChange::StatusChanged { user_id, .. }
            | OrderChange::Cancelled { user_id, .. } => *user_id,
        }
    }

    /// Returns the change kind as a string.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderChange::Created { .. } => "created",
            OrderChange::Edited { .. } => "edited",
            OrderChange::StatusChanged { .. } => "status_changed",
            OrderChange::Cancelled { .. } => "cancelled",
        }
    }
}

/// Receives order changes, typically to invalidate external caches.
///
/// Called after the change is committed. Implementations must not block
/// and cannot fail the operation that triggered them.
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, change: &OrderChange);
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for std::sync::Arc<N> {
    fn notify(&self, change: &OrderChange) {
        (**self).notify(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_every_variant() {
        let order_id = OrderId::new();
        let user_id = UserId::new();
        let change = OrderChange::StatusChanged {
            order_id,
            user_id,
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        };
        assert_eq!(change.order_id(), order_id);
        assert_eq!(change.user_id(), user_id);
        assert_eq!(change.kind(), "status_changed");
    }

    #[test]
    fn serializes_with_type_tag() {
        let change = OrderChange::Cancelled {
            order_id: OrderId::new(),
            user_id: UserId::new(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "cancelled");
    }
}
