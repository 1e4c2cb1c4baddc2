//! Cancellation of pending orders with full stock restitution.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Order, OrderError};
use store::{Store, StoreError, Transaction};

use crate::error::{OrderServiceError, Result};

/// Cancels pending orders and gives their stock back.
#[derive(Clone)]
pub struct CancellationHandler<S> {
    store: S,
}

impl<S: Store> CancellationHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cancels a pending order.
    ///
    /// Every line's quantity is returned to its variant and the order is
    /// saved as cancelled in the same transaction scope. The save is guarded
    /// by the revision that was read, so of two concurrent cancellations
    /// only one restores stock.
    #[tracing::instrument(skip(self, now))]
    pub async fn cancel(&self, order_id: OrderId, now: DateTime<Utc>) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        order.mark_cancelled(now)?;

        let mut tx = Transaction::begin();
        for item in order.items() {
            tx.adjust_stock(item.key(), i64::from(item.quantity));
        }
        tx.save_order(order.to_record()?, order.revision());

        let revision = match self.store.commit(tx).await {
            Ok(revision) => revision,
            Err(StoreError::RevisionConflict { .. }) => {
                return Err(self.explain_conflict(order_id).await);
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            %order_id,
            %revision,
            restored_units = order.total_quantity(),
            "Order cancelled"
        );

        Ok(order.with_revision(revision))
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        let record = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrderServiceError::NotFound(format!("order {}", order_id)))?;
        Ok(Order::from_record(&record)?)
    }

    /// Re-reads an order whose save lost a revision race and reports why.
    async fn explain_conflict(&self, order_id: OrderId) -> OrderServiceError {
        match self.load(order_id).await {
            Ok(current) if !current.status().can_cancel() => OrderError::NotPending {
                status: current.status(),
            }
            .into(),
            Ok(_) => OrderServiceError::State(format!(
                "order {} was modified concurrently",
                order_id
            )),
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{UserId, VariantKey};
    use domain::{Money, OrderItem, OrderStatus};
    use store::{InMemoryStore, OrderRepository, ProductRecord, StockLedger};

    use super::*;

    fn variant(size: &str) -> VariantKey {
        VariantKey::new("tee", size, "red")
    }

    async fn seeded() -> (InMemoryStore, OrderId) {
        let store = InMemoryStore::new();
        store
            .insert_product(
                ProductRecord::new("tee", "Tee", 1000)
                    .with_variant("M", "red", 3)
                    .with_variant("L", "red", 0),
            )
            .await;

        let order = Order::place(
            OrderId::new(),
            UserId::new(),
            vec![
                OrderItem::new(variant("M"), 2, Money::from_cents(1000), 5, 3),
                OrderItem::new(variant("L"), 1, Money::from_cents(1000), 1, 0),
            ],
            None,
            Utc::now(),
        )
        .unwrap();
        let order_id = order.id();
        store.insert_order(order.to_record().unwrap()).await.unwrap();
        (store, order_id)
    }

    async fn stock(store: &InMemoryStore, size: &str) -> u32 {
        store
            .variant_stock(&variant(size))
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[tokio::test]
    async fn test_cancel_restores_every_line() {
        let (store, order_id) = seeded().await;
        let handler = CancellationHandler::new(store.clone());

        let order = handler.cancel(order_id, Utc::now()).await.unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(stock(&store, "M").await, 5);
        assert_eq!(stock(&store, "L").await, 1);
    }

    #[tokio::test]
    async fn test_second_cancel_is_rejected_without_restitution() {
        let (store, order_id) = seeded().await;
        let handler = CancellationHandler::new(store.clone());

        handler.cancel(order_id, Utc::now()).await.unwrap();
        let err = handler.cancel(order_id, Utc::now()).await.unwrap_err();

        assert!(matches!(err, OrderServiceError::State(ref msg) if msg.contains("Only pending")));
        assert_eq!(stock(&store, "M").await, 5);
        assert_eq!(stock(&store, "L").await, 1);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let (store, _) = seeded().await;
        let handler = CancellationHandler::new(store);
        let err = handler.cancel(OrderId::new(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, OrderServiceError::NotFound(_)));
    }
}
