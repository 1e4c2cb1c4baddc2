//! Staged write sets committed as one all-or-nothing transaction scope.

use crate::{OrderRecord, Revision, VariantKey};

/// A signed change to one variant's stock. Negative values decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub key: VariantKey,
    pub delta: i64,
}

impl StockAdjustment {
    /// Returns the magnitude of the adjustment.
    pub fn magnitude(&self) -> u32 {
        u32::try_from(self.delta.unsigned_abs()).unwrap_or(u32::MAX)
    }
}

/// An order document save guarded by the revision the caller read.
#[derive(Debug, Clone)]
pub struct OrderWrite {
    pub record: OrderRecord,
    pub expected: Revision,
}

/// Mutations staged for a single transaction scope.
///
/// Nothing touches the store until the transaction is handed to
/// [`TransactionalStore::commit`](crate::TransactionalStore::commit). A commit
/// either applies every adjustment and the order save, or none of them.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    adjustments: Vec<StockAdjustment>,
    order: Option<OrderWrite>,
}

impl Transaction {
    /// Begins an empty transaction scope.
    pub fn begin() -> Self {
        Self::default()
    }

    /// Stages a stock change. Repeated keys are folded into one adjustment.
    pub fn adjust_stock(&mut self, key: VariantKey, delta: i64) -> &mut Self {
        if delta == 0 {
            return self;
        }
        match self.adjustments.iter_mut().find(|a| a.key == key) {
            Some(existing) => existing.delta += delta,
            None => self.adjustments.push(StockAdjustment { key, delta }),
        }
        self.adjustments.retain(|a| a.delta != 0);
        self
    }

    /// Stages the order save. The commit fails if the stored document is
    /// no longer at `expected`.
    pub fn save_order(&mut self, record: OrderRecord, expected: Revision) -> &mut Self {
        self.order = Some(OrderWrite { record, expected });
        self
    }

    /// Returns the staged stock adjustments.
    pub fn adjustments(&self) -> &[StockAdjustment] {
        &self.adjustments
    }

    /// Splits the transaction into its parts.
    pub fn into_parts(self) -> (Vec<StockAdjustment>, Option<OrderWrite>) {
        (self.adjustments, self.order)
    }
}
