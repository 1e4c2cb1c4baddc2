//! Order service exposing the ordering operations.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, UserId};
use domain::{ChangeNotifier, LineRequest, Order, OrderChange, ShippingInfo, validate_lines};
use serde::{Deserialize, Serialize};
use store::{OrderQuery, Store};

use crate::cancellation::CancellationHandler;
use crate::error::{OrderServiceError, Result};
use crate::reconciler::{EditOrder, EditReconciler};
use crate::reservation::ReservationSaga;
use crate::views::{OrderView, build_view, build_views};

/// A request to place a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub items: Vec<LineRequest>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
}

impl PlaceOrder {
    pub fn new(items: Vec<LineRequest>) -> Self {
        Self {
            items,
            shipping_info: None,
        }
    }

    pub fn with_shipping_info(mut self, shipping_info: ShippingInfo) -> Self {
        self.shipping_info = Some(shipping_info);
        self
    }
}

/// Limit/offset window for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl Page {
    fn apply(self, mut query: OrderQuery) -> OrderQuery {
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        query
    }
}

/// Service for placing, editing, cancelling and reading orders.
///
/// Every successful mutation is reported to the notifier after it has been
/// committed.
pub struct OrderService<S, N> {
    store: S,
    notifier: N,
    reservation: ReservationSaga<S>,
    reconciler: EditReconciler<S>,
    cancellation: CancellationHandler<S>,
}

impl<S, N> OrderService<S, N>
where
    S: Store + Clone,
    N: ChangeNotifier,
{
    /// Creates a new order service over a store.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            reservation: ReservationSaga::new(store.clone()),
            reconciler: EditReconciler::new(store.clone()),
            cancellation: CancellationHandler::new(store.clone()),
            store,
            notifier,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for a user.
    ///
    /// The order id is assigned before any stock is touched so every
    /// reservation log line can be traced back to it.
    #[tracing::instrument(skip(self, cmd), fields(lines = cmd.items.len()))]
    pub async fn place_order(&self, user_id: UserId, cmd: PlaceOrder) -> Result<Order> {
        let start = Instant::now();
        let result = self.try_place_order(user_id, cmd).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(order_id = %order.id(), total = %order.total(), "Order placed");
                self.notifier.notify(&OrderChange::Created {
                    order_id: order.id(),
                    user_id,
                });
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.reason()).increment(1);
                tracing::info!(error = %e, "Order rejected");
            }
        }

        result
    }

    async fn try_place_order(&self, user_id: UserId, cmd: PlaceOrder) -> Result<Order> {
        validate_lines(&cmd.items)?;

        let order_id = OrderId::new();
        let now = Utc::now();
        let reservation = self.reservation.reserve(order_id, &cmd.items, now).await?;

        let placed = Order::place(order_id, user_id, reservation.items, cmd.shipping_info, now)
            .and_then(|order| Ok((order.to_record()?, order)));
        let (record, order) = match placed {
            Ok(placed) => placed,
            Err(e) => {
                self.reservation.compensate(order_id, &reservation.log).await;
                return Err(e.into());
            }
        };

        match self.store.insert_order(record).await {
            Ok(revision) => Ok(order.with_revision(revision)),
            Err(e) => {
                self.reservation.compensate(order_id, &reservation.log).await;
                Err(e.into())
            }
        }
    }

    /// Edits an order's items and/or metadata.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn edit_order(&self, cmd: EditOrder) -> Result<Order> {
        let outcome = self.reconciler.edit(&cmd, Utc::now()).await?;
        let order = outcome.order;

        metrics::counter!("orders_edited_total").increment(1);
        self.notifier.notify(&OrderChange::Edited {
            order_id: order.id(),
            user_id: order.user_id(),
        });
        if let Some((from, to)) = outcome.transition {
            self.notifier.notify(&OrderChange::StatusChanged {
                order_id: order.id(),
                user_id: order.user_id(),
                from,
                to,
            });
        }

        Ok(order)
    }

    /// Cancels a pending order and restores its stock.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.cancellation.cancel(order_id, Utc::now()).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        self.notifier.notify(&OrderChange::Cancelled {
            order_id: order.id(),
            user_id: order.user_id(),
        });

        Ok(order)
    }

    /// Returns an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        let record = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderServiceError::NotFound(format!("order {}", order_id)))?;
        Ok(Order::from_record(&record)?)
    }

    /// Returns an order only if it belongs to `user_id`.
    ///
    /// Someone else's order is reported as not found.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_for(&self, user_id: UserId, order_id: OrderId) -> Result<Order> {
        let order = self.get_order(order_id).await?;
        if order.user_id() != user_id {
            return Err(OrderServiceError::NotFound(format!("order {}", order_id)));
        }
        Ok(order)
    }

    /// Lists a user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: UserId, page: Page) -> Result<Vec<Order>> {
        self.list(page.apply(OrderQuery::for_user(user_id))).await
    }

    /// Lists all orders matching a query, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        self.list(query).await
    }

    async fn list(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let records = self.store.list_orders(query).await?;
        records
            .iter()
            .map(|record| Order::from_record(record).map_err(OrderServiceError::from))
            .collect()
    }

    /// Returns the display view of an order.
    pub async fn view(&self, order: &Order) -> Result<OrderView> {
        build_view(&self.store, order).await
    }

    /// Returns the display views of several orders.
    pub async fn views(&self, orders: &[Order]) -> Result<Vec<OrderView>> {
        build_views(&self.store, orders).await
    }

    pub async fn get_order_view(&self, order_id: OrderId) -> Result<OrderView> {
        let order = self.get_order(order_id).await?;
        self.view(&order).await
    }

    pub async fn get_order_view_for(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderView> {
        let order = self.get_order_for(user_id, order_id).await?;
        self.view(&order).await
    }

    pub async fn list_user_order_views(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<Vec<OrderView>> {
        let orders = self.list_user_orders(user_id, page).await?;
        self.views(&orders).await
    }

    pub async fn list_all_order_views(&self, query: OrderQuery) -> Result<Vec<OrderView>> {
        let orders = self.list_all_orders(query).await?;
        self.views(&orders).await
    }
}
