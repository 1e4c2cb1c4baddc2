use async_trait::async_trait;

use crate::{
    ColorId, OrderId, OrderQuery, OrderRecord, ProductId, ProductRecord, Result, Revision, SizeId,
    StockChange, Transaction, VariantKey, VariantStock,
};

/// The variant stock ledger.
///
/// Every mutation is a single atomic operation against the backing store;
/// implementations must never expose a read-then-write window.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Returns the current stock of a variant, or None if it does not exist.
    async fn variant_stock(&self, key: &VariantKey) -> Result<Option<VariantStock>>;

    /// Decrements stock by `quantity` only if the current stock is at least
    /// `quantity`.
    ///
    /// Fails with `VariantNotFound` if the variant does not exist and with
    /// `ConditionFailed` if the condition did not hold at write time.
    async fn try_decrement(&self, key: &VariantKey, quantity: u32) -> Result<StockChange>;

    /// Increments stock by `quantity`.
    async fn increment(&self, key: &VariantKey, quantity: u32) -> Result<StockChange>;
}

/// Storage of order documents.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a new order document at [`Revision::first`].
    ///
    /// Fails with `DuplicateOrder` if the ID is taken.
    async fn insert_order(&self, record: OrderRecord) -> Result<Revision>;

    /// Retrieves an order document.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists order documents matching a query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>>;
}

/// Read access to the catalog owned by another component.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Retrieves a product with its variants and raw discount configuration.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>>;

    /// Resolves a size's display name.
    async fn size_name(&self, size_id: &SizeId) -> Result<Option<String>>;

    /// Resolves a color's display name.
    async fn color_name(&self, color_id: &ColorId) -> Result<Option<String>>;
}

/// Capability to commit a multi-document transaction scope.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Commits every staged stock adjustment and the staged order save
    /// atomically.
    ///
    /// Decrements are re-checked inside the scope. A failed condition, a
    /// missing variant, or an order revision other than the expected one
    /// aborts the whole scope with nothing written. Returns the new order
    /// revision, or [`Revision::initial`] if no order save was staged.
    async fn commit(&self, tx: Transaction) -> Result<Revision>;
}

/// Everything the ordering engine needs from one backing store.
pub trait Store: StockLedger + OrderRepository + CatalogReader + TransactionalStore {}

impl<T> Store for T where T: StockLedger + OrderRepository + CatalogReader + TransactionalStore {}

/// Extension trait providing convenience methods for ledgers.
#[async_trait]
pub trait StockLedgerExt: StockLedger {
    /// Returns the current stock of a variant, failing if it does not exist.
    async fn require_stock(&self, key: &VariantKey) -> Result<u32> {
        self.variant_stock(key)
            .await?
            .map(|v| v.stock)
            .ok_or_else(|| crate::StoreError::VariantNotFound(key.clone()))
    }
}

// Blanket implementation for all ledgers
impl<T: StockLedger + ?Sized> StockLedgerExt for T {}
