//! Storage for the ordering engine.
//!
//! Three kinds of documents live here:
//! - the variant stock ledger, mutated only by atomic conditional updates
//! - order documents, guarded by an optimistic revision
//! - catalog products, read-only from this engine's point of view
//!
//! [`TransactionalStore`] grants the multi-document transaction scope that
//! order edits and cancellations need. Order creation deliberately goes
//! through the per-variant [`StockLedger`] operations instead.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;
pub mod transaction;

pub use common::{ColorId, OrderId, ProductId, SizeId, UserId, VariantKey};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderQuery;
pub use record::{OrderRecord, ProductRecord, Revision, StockChange, VariantRecord, VariantStock};
pub use store::{
    CatalogReader, OrderRepository, StockLedger, StockLedgerExt, Store, TransactionalStore,
};
pub use transaction::{OrderWrite, StockAdjustment, Transaction};
