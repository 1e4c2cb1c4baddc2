use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ColorId, OrderId, ProductId, SizeId, UserId, VariantKey};

/// Revision number of an order document, used for optimistic concurrency control.
///
/// A freshly inserted document is at revision 1; every committed save
/// increments it by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(i64);

impl Revision {
    /// Creates a revision from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the initial revision (0) of a document that does not exist yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the revision (1) of a freshly inserted document.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next revision.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw revision value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Revision {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Current stock of a single variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantStock {
    pub key: VariantKey,
    pub stock: u32,
}

/// Stock values observed immediately around an atomic ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub key: VariantKey,
    pub before: u32,
    pub after: u32,
}

impl StockChange {
    /// Returns the magnitude of the mutation.
    pub fn quantity(&self) -> u32 {
        self.before.abs_diff(self.after)
    }
}

/// A variant row of a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub stock: u32,
}

/// A catalog product as the ordering engine reads it.
///
/// `discount` is the raw catalog payload; interpreting it is up to the
/// pricing code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: ProductId,
    pub name: String,
    pub base_price_cents: i64,
    pub discount: Option<serde_json::Value>,
    pub variants: Vec<VariantRecord>,
}

impl ProductRecord {
    /// Creates a product without a discount or variants.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        base_price_cents: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            base_price_cents,
            discount: None,
            variants: Vec::new(),
        }
    }

    /// Attaches a raw discount payload.
    pub fn with_discount(mut self, discount: serde_json::Value) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Adds a variant with the given starting stock.
    pub fn with_variant(
        mut self,
        size_id: impl Into<SizeId>,
        color_id: impl Into<ColorId>,
        stock: u32,
    ) -> Self {
        self.variants.push(VariantRecord {
            size_id: size_id.into(),
            color_id: color_id.into(),
            stock,
        });
        self
    }

    /// Looks up the variant for a size/color pair.
    pub fn variant(&self, size_id: &SizeId, color_id: &ColorId) -> Option<&VariantRecord> {
        self.variants
            .iter()
            .find(|v| &v.size_id == size_id && &v.color_id == color_id)
    }
}

/// A persisted order document.
///
/// The full order is kept as JSON in `document`; `user_id` and `status`
/// are duplicated as columns so listings can filter without decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: String,
    pub revision: Revision,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub document: serde_json::Value,
}
