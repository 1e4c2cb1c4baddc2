//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};
use store::{OrderRecord, Revision};

use super::{Money, OrderError, OrderItem, OrderMetadata, OrderStatus, ShippingInfo};

/// Order aggregate root.
///
/// Holds the reserved lines with their price and stock snapshots, the
/// lifecycle status and shipping metadata. The total is always the sum of
/// the line totals and is recomputed whenever the lines change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    total: Money,
    status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shipping_company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shipping_info: Option<ShippingInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Revision of the persisted document this value was read from.
    #[serde(skip)]
    revision: Revision,
}

impl Order {
    /// Creates a pending order from already reserved lines.
    pub fn place(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_info: Option<ShippingInfo>,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut order = Self {
            id,
            user_id,
            items,
            total: Money::zero(),
            status: OrderStatus::Pending,
            tracking_number: None,
            shipping_company: None,
            admin_comment: None,
            shipping_info,
            created_at: now,
            updated_at: now,
            revision: Revision::initial(),
        };
        order.recalculate_total();
        Ok(order)
    }

    /// Decodes an order from its persisted document.
    pub fn from_record(record: &OrderRecord) -> Result<Self, OrderError> {
        let mut order: Order = serde_json::from_value(record.document.clone())
            .map_err(|e| OrderError::CorruptDocument(format!("{}: {}", record.order_id, e)))?;
        if order.id != record.order_id {
            return Err(OrderError::CorruptDocument(format!(
                "document id {} does not match record {}",
                order.id, record.order_id
            )));
        }
        order.revision = record.revision;
        Ok(order)
    }

    /// Encodes the order as a persistable document.
    pub fn to_record(&self) -> Result<OrderRecord, OrderError> {
        let document = serde_json::to_value(self)
            .map_err(|e| OrderError::CorruptDocument(format!("{}: {}", self.id, e)))?;
        Ok(OrderRecord {
            order_id: self.id,
            user_id: self.user_id,
            status: self.status.as_str().to_string(),
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
            document,
        })
    }

    /// Returns the order with its persisted revision set.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    fn recalculate_total(&mut self) {
        self.total = self.items.iter().map(OrderItem::line_total).sum();
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the lines in the order they were requested.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn shipping_company(&self) -> Option<&str> {
        self.shipping_company.as_deref()
    }

    pub fn admin_comment(&self) -> Option<&str> {
        self.admin_comment.as_deref()
    }

    pub fn shipping_info(&self) -> Option<&ShippingInfo> {
        self.shipping_info.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the revision of the document this order was loaded from.
    pub fn revision(&self) -> Revision {
        self.revision
    }
}

// Mutations
impl Order {
    /// Replaces the lines of a pending order and recomputes the total.
    ///
    /// The caller is responsible for carrying snapshots over from the
    /// previous lines and for reconciling stock.
    pub fn replace_items(
        &mut self,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.status.can_edit_items() {
            return Err(OrderError::ItemsLocked {
                status: self.status,
            });
        }
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        self.items = items;
        self.recalculate_total();
        self.updated_at = now;
        Ok(())
    }

    /// Applies status and shipping metadata from an edit.
    ///
    /// Returns the `(from, to)` pair when the status actually changed.
    /// Nothing is modified if the requested status is not reachable.
    pub fn apply_metadata(
        &mut self,
        metadata: &OrderMetadata,
        now: DateTime<Utc>,
    ) -> Result<Option<(OrderStatus, OrderStatus)>, OrderError> {
        let transition = match metadata.status {
            Some(next) if !self.status.can_transition_to(next) => {
                return Err(OrderError::InvalidStateTransition {
                    from: self.status,
                    to: next,
                });
            }
            Some(next) if next != self.status => Some((self.status, next)),
            _ => None,
        };

        if let Some((_, next)) = transition {
            self.status = next;
        }
        if let Some(ref tracking_number) = metadata.tracking_number {
            self.tracking_number = Some(tracking_number.clone());
        }
        if let Some(ref shipping_company) = metadata.shipping_company {
            self.shipping_company = Some(shipping_company.clone());
        }
        if let Some(ref admin_comment) = metadata.admin_comment {
            self.admin_comment = Some(admin_comment.clone());
        }
        if !metadata.is_empty() {
            self.updated_at = now;
        }

        Ok(transition)
    }

    /// Moves a pending order to `Cancelled`.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::NotPending {
                status: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}
