//! Stock reservation for new orders.
//!
//! Placing an order reserves each line with its own atomic conditional
//! decrement. There is no transaction spanning the lines: every applied
//! decrement is written to a compensation log, and if a later line fails
//! the log is replayed in reverse to give the stock back.

use chrono::{DateTime, Utc};
use common::{OrderId, VariantKey};
use domain::{LineRequest, OrderItem, product_price};
use store::{CatalogReader, StockChange, StockLedger, StoreError};

use crate::error::{OrderServiceError, Result};

/// Decrements applied so far for one reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationLog {
    entries: Vec<StockChange>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an applied decrement.
    pub fn record(&mut self, change: StockChange) {
        self.entries.push(change);
    }

    /// Returns the recorded decrements in the order they were applied.
    pub fn entries(&self) -> &[StockChange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A completed reservation: the snapshotted lines plus the log needed to
/// undo it.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub items: Vec<OrderItem>,
    pub log: CompensationLog,
}

/// Outcome of replaying a compensation log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompensationReport {
    pub restored: usize,
    pub failed: usize,
}

/// Reserves stock for the lines of a new order.
///
/// Only needs single-record conditional updates from the store.
#[derive(Clone)]
pub struct ReservationSaga<S> {
    store: S,
}

impl<S> ReservationSaga<S>
where
    S: StockLedger + CatalogReader,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reserves every line in list order.
    ///
    /// On the first failure all decrements applied for this request are
    /// compensated and the originating error is returned.
    #[tracing::instrument(skip(self, lines, now), fields(lines = lines.len()))]
    pub async fn reserve(
        &self,
        order_id: OrderId,
        lines: &[LineRequest],
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let mut log = CompensationLog::new();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            match self.reserve_line(order_id, line, now).await {
                Ok((item, change)) => {
                    log.record(change);
                    items.push(item);
                }
                Err(e) => {
                    tracing::warn!(
                        %order_id,
                        error = %e,
                        reserved = log.len(),
                        "Reservation failed, compensating"
                    );
                    self.compensate(order_id, &log).await;
                    return Err(e);
                }
            }
        }

        Ok(Reservation { items, log })
    }

    async fn reserve_line(
        &self,
        order_id: OrderId,
        line: &LineRequest,
        now: DateTime<Utc>,
    ) -> Result<(OrderItem, StockChange)> {
        let key = line.key();
        let product = self
            .store
            .get_product(&key.product_id)
            .await?
            .ok_or_else(|| OrderServiceError::NotFound(format!("product {}", key.product_id)))?;
        let variant = product
            .variant(&key.size_id, &key.color_id)
            .ok_or_else(|| OrderServiceError::NotFound(format!("variant {}", key)))?;

        if variant.stock < line.quantity {
            return Err(OrderServiceError::insufficient(
                key,
                line.quantity,
                variant.stock,
            ));
        }

        let unit_price = product_price(&product, now);

        let change = match self.store.try_decrement(&key, line.quantity).await {
            Ok(change) => change,
            // The pre-read saw enough stock, so another request got there first
            Err(StoreError::ConditionFailed { .. }) => {
                return Err(OrderServiceError::conflict(key));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("stock_decrements_total").increment(1);
        tracing::info!(
            %order_id,
            variant = %key,
            quantity = line.quantity,
            before = change.before,
            after = change.after,
            "Stock reserved"
        );

        let item = OrderItem::new(key, line.quantity, unit_price, change.before, change.after);
        Ok((item, change))
    }

    /// Gives back every decrement in the log, newest first.
    ///
    /// Every entry is attempted. Failures are logged and counted, never
    /// returned.
    #[tracing::instrument(skip(self, log), fields(entries = log.len()))]
    pub async fn compensate(&self, order_id: OrderId, log: &CompensationLog) -> CompensationReport {
        let mut report = CompensationReport::default();

        for change in log.entries().iter().rev() {
            match self.store.increment(&change.key, change.quantity()).await {
                Ok(_) => {
                    report.restored += 1;
                    metrics::counter!("reservation_compensations_total").increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("reservation_compensation_failures_total").increment(1);
                    log_lost_stock(order_id, &change.key, change.quantity(), &e);
                }
            }
        }

        report
    }
}

fn log_lost_stock(order_id: OrderId, key: &VariantKey, quantity: u32, error: &StoreError) {
    tracing::error!(
        %order_id,
        variant = %key,
        quantity,
        error = %error,
        "Failed to restore reserved stock"
    );
}
