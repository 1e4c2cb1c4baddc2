use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    ColorId, OrderId, OrderQuery, OrderRecord, ProductId, ProductRecord, Result, Revision, SizeId,
    StockChange, StoreError, Transaction, VariantKey, VariantRecord, VariantStock,
    store::{CatalogReader, OrderRepository, StockLedger, TransactionalStore},
};

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, ProductRecord>,
    sizes: HashMap<SizeId, String>,
    colors: HashMap<ColorId, String>,
    orders: HashMap<OrderId, OrderRecord>,
    failing_increments: usize,
}

impl MemoryState {
    fn variant(&self, key: &VariantKey) -> Option<&VariantRecord> {
        self.products
            .get(&key.product_id)?
            .variant(&key.size_id, &key.color_id)
    }

    fn variant_mut(&mut self, key: &VariantKey) -> Option<&mut VariantRecord> {
        self.products
            .get_mut(&key.product_id)?
            .variants
            .iter_mut()
            .find(|v| v.size_id == key.size_id && v.color_id == key.color_id)
    }

    fn current_revision(&self, order_id: OrderId) -> Revision {
        self.orders
            .get(&order_id)
            .map(|o| o.revision)
            .unwrap_or(Revision::initial())
    }
}

/// In-memory store implementation for tests and local development.
///
/// All state sits behind one lock. Each ledger operation and each commit
/// holds the write lock for its whole duration, which makes them atomic in
/// the same way a single-document conditional update is.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a catalog product.
    pub async fn insert_product(&self, product: ProductRecord) {
        self.state
            .write()
            .await
            .products
            .insert(product.product_id.clone(), product);
    }

    /// Registers a size display name.
    pub async fn insert_size(&self, size_id: impl Into<SizeId>, name: impl Into<String>) {
        self.state
            .write()
            .await
            .sizes
            .insert(size_id.into(), name.into());
    }

    /// Registers a color display name.
    pub async fn insert_color(&self, color_id: impl Into<ColorId>, name: impl Into<String>) {
        self.state
            .write()
            .await
            .colors
            .insert(color_id.into(), name.into());
    }

    /// Overwrites a variant's stock, bypassing the ledger protocol.
    pub async fn set_stock(&self, key: &VariantKey, stock: u32) -> Result<()> {
        let mut state = self.state.write().await;
        let variant = state
            .variant_mut(key)
            .ok_or_else(|| StoreError::VariantNotFound(key.clone()))?;
        variant.stock = stock;
        Ok(())
    }

    /// Makes the next `count` calls to [`StockLedger::increment`] fail.
    pub async fn fail_next_increments(&self, count: usize) {
        self.state.write().await.failing_increments = count;
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl StockLedger for InMemoryStore {
    async fn variant_stock(&self, key: &VariantKey) -> Result<Option<VariantStock>> {
        let state = self.state.read().await;
        Ok(state.variant(key).map(|v| VariantStock {
            key: key.clone(),
            stock: v.stock,
        }))
    }

    async fn try_decrement(&self, key: &VariantKey, quantity: u32) -> Result<StockChange> {
        let mut state = self.state.write().await;
        let variant = state
            .variant_mut(key)
            .ok_or_else(|| StoreError::VariantNotFound(key.clone()))?;

        if variant.stock < quantity {
            return Err(StoreError::ConditionFailed {
                key: key.clone(),
                requested: quantity,
                available: variant.stock,
            });
        }

        let before = variant.stock;
        variant.stock -= quantity;
        Ok(StockChange {
            key: key.clone(),
            before,
            after: variant.stock,
        })
    }

    async fn increment(&self, key: &VariantKey, quantity: u32) -> Result<StockChange> {
        let mut state = self.state.write().await;

        if state.failing_increments > 0 {
            state.failing_increments -= 1;
            return Err(StoreError::Unavailable(format!(
                "injected increment failure for {key}"
            )));
        }

        let variant = state
            .variant_mut(key)
            .ok_or_else(|| StoreError::VariantNotFound(key.clone()))?;
        let before = variant.stock;
        variant.stock = before
            .checked_add(quantity)
            .ok_or_else(|| StoreError::Unavailable(format!("stock overflow for {key}")))?;
        Ok(StockChange {
            key: key.clone(),
            before,
            after: variant.stock,
        })
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, mut record: OrderRecord) -> Result<Revision> {
        let mut state = self.state.write().await;
        if state.orders.contains_key(&record.order_id) {
            return Err(StoreError::DuplicateOrder(record.order_id));
        }
        record.revision = Revision::first();
        state.orders.insert(record.order_id, record);
        Ok(Revision::first())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| {
                if let Some(user_id) = query.user_id
                    && o.user_id != user_id
                {
                    return false;
                }
                if let Some(ref status) = query.status
                    && &o.status != status
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();

        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.order_id.as_uuid().cmp(&a.order_id.as_uuid()))
        });

        let offset = query.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match query.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }
}

#[async_trait]
impl CatalogReader for InMemoryStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn size_name(&self, size_id: &SizeId) -> Result<Option<String>> {
        Ok(self.state.read().await.sizes.get(size_id).cloned())
    }

    async fn color_name(&self, color_id: &ColorId) -> Result<Option<String>> {
        Ok(self.state.read().await.colors.get(color_id).cloned())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn commit(&self, tx: Transaction) -> Result<Revision> {
        let (adjustments, order) = tx.into_parts();
        let mut state = self.state.write().await;

        // Validate the whole scope before touching anything
        if let Some(ref write) = order {
            let actual = state.current_revision(write.record.order_id);
            if actual != write.expected {
                return Err(StoreError::RevisionConflict {
                    order_id: write.record.order_id,
                    expected: write.expected,
                    actual,
                });
            }
        }

        for adjustment in &adjustments {
            let variant = state
                .variant(&adjustment.key)
                .ok_or_else(|| StoreError::VariantNotFound(adjustment.key.clone()))?;
            let next = i64::from(variant.stock) + adjustment.delta;
            if next < 0 {
                return Err(StoreError::ConditionFailed {
                    key: adjustment.key.clone(),
                    requested: adjustment.magnitude(),
                    available: variant.stock,
                });
            }
            if next > i64::from(u32::MAX) {
                return Err(StoreError::Unavailable(format!(
                    "stock overflow for {}",
                    adjustment.key
                )));
            }
        }

        // Apply
        for adjustment in &adjustments {
            if let Some(variant) = state.variant_mut(&adjustment.key) {
                let next = i64::from(variant.stock) + adjustment.delta;
                variant.stock = u32::try_from(next).unwrap_or(variant.stock);
            }
        }

        match order {
            Some(write) => {
                let revision = write.expected.next();
                let mut record = write.record;
                record.revision = revision;
                state.orders.insert(record.order_id, record);
                Ok(revision)
            }
            None => Ok(Revision::initial()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::UserId;

    fn key() -> VariantKey {
        VariantKey::new("tee", "M", "red")
    }

    async fn seeded(stock: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_product(ProductRecord::new("tee", "Tee", 2000).with_variant("M", "red", stock))
            .await;
        store
    }

    fn order_record(user_id: UserId) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            order_id: OrderId::new(),
            user_id,
            status: "pending".to_string(),
            revision: Revision::initial(),
            created_at: now,
            updated_at: now,
            document: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn try_decrement_applies_when_stock_suffices() {
        let store = seeded(5).await;

        let change = store.try_decrement(&key(), 3).await.unwrap();
        assert_eq!(change.before, 5);
        assert_eq!(change.after, 2);

        let stock = store.variant_stock(&key()).await.unwrap().unwrap();
        assert_eq!(stock.stock, 2);
    }

    #[tokio::test]
    async fn try_decrement_refuses_to_go_negative() {
        let store = seeded(2).await;

        let err = store.try_decrement(&key(), 3).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConditionFailed {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(store.variant_stock(&key()).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn try_decrement_unknown_variant() {
        let store = seeded(2).await;
        let missing = VariantKey::new("tee", "XL", "red");

        let err = store.try_decrement(&missing, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::VariantNotFound(_)));
    }

    #[tokio::test]
    async fn increment_and_injected_failures() {
        let store = seeded(1).await;
        store.fail_next_increments(1).await;

        assert!(matches!(
            store.increment(&key(), 2).await,
            Err(StoreError::Unavailable(_))
        ));
        let change = store.increment(&key(), 2).await.unwrap();
        assert_eq!((change.before, change.after), (1, 3));
    }

    #[tokio::test]
    async fn increment_past_range_writes_nothing() {
        let store = seeded(u32::MAX - 1).await;

        assert!(matches!(
            store.increment(&key(), 2).await,
            Err(StoreError::Unavailable(_))
        ));
        let stock = store.variant_stock(&key()).await.unwrap().unwrap().stock;
        assert_eq!(stock, u32::MAX - 1);
    }

    #[tokio::test]
    async fn insert_order_rejects_duplicates() {
        let store = InMemoryStore::new();
        let record = order_record(UserId::new());

        assert_eq!(
            store.insert_order(record.clone()).await.unwrap(),
            Revision::first()
        );
        assert!(matches!(
            store.insert_order(record).await,
            Err(StoreError::DuplicateOrder(_))
        ));
    }

    #[tokio::test]
    async fn list_orders_filters_and_pages_newest_first() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let base = Utc::now();

        for i in 0..3 {
            let mut record = order_record(user);
            record.created_at = base + Duration::seconds(i);
            store.insert_order(record).await.unwrap();
        }
        store.insert_order(order_record(UserId::new())).await.unwrap();

        let mine = store.list_orders(OrderQuery::for_user(user)).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine[0].created_at > mine[1].created_at);

        let page = store
            .list_orders(OrderQuery::for_user(user).offset(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].order_id, mine[1].order_id);

        assert_eq!(store.list_orders(OrderQuery::new()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn commit_applies_everything() {
        let store = seeded(10).await;
        let record = order_record(UserId::new());
        let order_id = record.order_id;
        store.insert_order(record.clone()).await.unwrap();

        let mut tx = Transaction::begin();
        tx.adjust_stock(key(), -3)
            .save_order(record, Revision::first());
        let revision = store.commit(tx).await.unwrap();

        assert_eq!(revision, Revision::new(2));
        assert_eq!(store.variant_stock(&key()).await.unwrap().unwrap().stock, 7);
        let stored = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.revision, Revision::new(2));
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing_on_stock_shortfall() {
        let store = seeded(2).await;
        store
            .insert_product(ProductRecord::new("cap", "Cap", 900).with_variant("U", "blue", 8))
            .await;
        let cap = VariantKey::new("cap", "U", "blue");

        let mut tx = Transaction::begin();
        tx.adjust_stock(cap.clone(), 4).adjust_stock(key(), -5);
        let err = store.commit(tx).await.unwrap_err();

        assert!(matches!(err, StoreError::ConditionFailed { .. }));
        assert_eq!(store.variant_stock(&cap).await.unwrap().unwrap().stock, 8);
        assert_eq!(store.variant_stock(&key()).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn commit_rejects_stale_revision() {
        let store = seeded(5).await;
        let record = order_record(UserId::new());
        store.insert_order(record.clone()).await.unwrap();

        let mut first = Transaction::begin();
        first.save_order(record.clone(), Revision::first());
        store.commit(first).await.unwrap();

        let mut stale = Transaction::begin();
        stale
            .adjust_stock(key(), 2)
            .save_order(record, Revision::first());
        let err = store.commit(stale).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::RevisionConflict {
                expected,
                actual,
                ..
            } if expected == Revision::first() && actual == Revision::new(2)
        ));
        assert_eq!(store.variant_stock(&key()).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn concurrent_decrements_never_oversell() {
        let store = seeded(10).await;

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.try_decrement(&key(), 1).await },
            ));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(store.variant_stock(&key()).await.unwrap().unwrap().stock, 0);
    }
}
