//! Value objects for the order domain.

use std::collections::HashSet;

use common::{ColorId, ProductId, SizeId, VariantKey};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus};

/// Money amount represented in cents to avoid floating point issues.
///
/// Arithmetic saturates at the `i64` bounds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.0.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Subtracts another amount, flooring the result at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line of an order with its write-once snapshots.
///
/// `unit_price`, `stock_before_purchase` and `stock_at_purchase` are taken
/// when the line is first reserved and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub quantity: u32,

    /// Effective price charged per unit.
    pub unit_price: Money,

    /// Variant stock observed just before this line was reserved.
    pub stock_before_purchase: u32,

    /// Variant stock observed just after this line was reserved.
    pub stock_at_purchase: u32,
}

impl OrderItem {
    /// Creates an item from a reserved variant and its snapshots.
    pub fn new(
        key: VariantKey,
        quantity: u32,
        unit_price: Money,
        stock_before_purchase: u32,
        stock_at_purchase: u32,
    ) -> Self {
        Self {
            product_id: key.product_id,
            size_id: key.size_id,
            color_id: key.color_id,
            quantity,
            unit_price,
            stock_before_purchase,
            stock_at_purchase,
        }
    }

    /// Returns the variant this line reserves.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id.clone(),
            size_id: self.size_id.clone(),
            color_id: self.color_id.clone(),
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Delivery address attached to an order. All fields are free-form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A requested order line, before any stock has been touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub quantity: u32,
}

impl LineRequest {
    /// Creates a new line request.
    pub fn new(
        product_id: impl Into<ProductId>,
        size_id: impl Into<SizeId>,
        color_id: impl Into<ColorId>,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            size_id: size_id.into(),
            color_id: color_id.into(),
            quantity,
        }
    }

    /// Returns the variant this line targets.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            product_id: self.product_id.clone(),
            size_id: self.size_id.clone(),
            color_id: self.color_id.clone(),
        }
    }
}

/// Validates a list of requested lines.
///
/// The list must be non-empty, every quantity positive, and no variant
/// may appear twice.
pub fn validate_lines(lines: &[LineRequest]) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                key: line.key(),
                quantity: line.quantity,
            });
        }
        if !seen.insert(line.key()) {
            return Err(OrderError::DuplicateLine { key: line.key() });
        }
    }

    Ok(())
}

/// Non-item fields an edit may set. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMetadata {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub shipping_company: Option<String>,
    #[serde(default)]
    pub admin_comment: Option<String>,
}

impl OrderMetadata {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.tracking_number.is_none()
            && self.shipping_company.is_none()
            && self.admin_comment.is_none()
    }
}
