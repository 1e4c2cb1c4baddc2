//! Edit reconciliation for placed orders.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{
    LineRequest, Order, OrderItem, OrderMetadata, OrderStatus, PlannedLine, plan_edit,
    product_price, validate_lines,
};
use serde::{Deserialize, Serialize};
use store::{StockLedgerExt, Store, StoreError, Transaction};

use crate::error::{OrderServiceError, Result};

/// An edit to a placed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditOrder {
    pub order_id: OrderId,

    /// Replacement item list. `None` leaves the items untouched.
    #[serde(default)]
    pub items: Option<Vec<LineRequest>>,

    #[serde(default)]
    pub metadata: OrderMetadata,
}

impl EditOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            items: None,
            metadata: OrderMetadata::default(),
        }
    }

    pub fn with_items(mut self, items: Vec<LineRequest>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.metadata.status = Some(status);
        self
    }

    pub fn with_metadata(mut self, metadata: OrderMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of a committed edit.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub order: Order,

    /// `(from, to)` when the edit changed the status.
    pub transition: Option<(OrderStatus, OrderStatus)>,

    /// True if any stock was adjusted.
    pub stock_changed: bool,
}

/// Applies edits to placed orders, reconciling the stock ledger with the
/// new quantities inside one transaction scope.
#[derive(Clone)]
pub struct EditReconciler<S> {
    store: S,
}

impl<S: Store> EditReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies an edit.
    ///
    /// Existing lines keep their price and stock snapshots; only new lines
    /// are priced. Every shortfall is detected before anything is written,
    /// and the stock adjustments commit together with the order save.
    #[tracing::instrument(skip(self, cmd, now), fields(order_id = %cmd.order_id))]
    pub async fn edit(&self, cmd: &EditOrder, now: DateTime<Utc>) -> Result<EditOutcome> {
        let record = self
            .store
            .get_order(cmd.order_id)
            .await?
            .ok_or_else(|| OrderServiceError::NotFound(format!("order {}", cmd.order_id)))?;
        let mut order = Order::from_record(&record)?;
        let mut tx = Transaction::begin();
        let mut stock_changed = false;

        if let Some(ref lines) = cmd.items {
            validate_lines(lines)?;
            if !order.status().can_edit_items() {
                return Err(domain::OrderError::ItemsLocked {
                    status: order.status(),
                }
                .into());
            }

            let plan = plan_edit(order.items(), lines);
            let mut items = Vec::with_capacity(plan.lines().len());
            for line in plan.lines() {
                items.push(self.rebuild_line(line, now).await?);
            }
            for (key, delta) in plan.stock_deltas() {
                tx.adjust_stock(key, delta);
            }
            stock_changed = !plan.is_noop();

            order.replace_items(items, now)?;
        }

        let transition = order.apply_metadata(&cmd.metadata, now)?;

        let adjustments = tx.adjustments().len();
        let expected = order.revision();
        tx.save_order(order.to_record()?, expected);
        let revision = self.store.commit(tx).await.map_err(|e| match e {
            // Every shortfall passed the pre-check, so a concurrent writer won
            StoreError::ConditionFailed { key, .. } => OrderServiceError::conflict(key),
            other => other.into(),
        })?;

        tracing::info!(
            order_id = %cmd.order_id,
            %revision,
            adjustments,
            "Order edited"
        );

        Ok(EditOutcome {
            order: order.with_revision(revision),
            transition,
            stock_changed,
        })
    }

    /// Builds the persisted line for one requested line, checking that any
    /// additional quantity is available.
    async fn rebuild_line(&self, line: &PlannedLine<'_>, now: DateTime<Utc>) -> Result<OrderItem> {
        if let Some(previous) = line.previous {
            if line.diff > 0 {
                let needed = u32::try_from(line.diff).unwrap_or(u32::MAX);
                let available = self.store.require_stock(&line.key).await?;
                if available < needed {
                    return Err(OrderServiceError::insufficient(
                        line.key.clone(),
                        needed,
                        available,
                    ));
                }
            }
            return Ok(OrderItem {
                quantity: line.quantity,
                ..previous.clone()
            });
        }

        let product = self
            .store
            .get_product(&line.key.product_id)
            .await?
            .ok_or_else(|| {
                OrderServiceError::NotFound(format!("product {}", line.key.product_id))
            })?;
        let available = product
            .variant(&line.key.size_id, &line.key.color_id)
            .map(|variant| variant.stock)
            .ok_or_else(|| OrderServiceError::NotFound(format!("variant {}", line.key)))?;
        if available < line.quantity {
            return Err(OrderServiceError::insufficient(
                line.key.clone(),
                line.quantity,
                available,
            ));
        }

        Ok(OrderItem::new(
            line.key.clone(),
            line.quantity,
            product_price(&product, now),
            available,
            available - line.quantity,
        ))
    }
}
