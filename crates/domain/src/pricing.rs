//! Effective price resolution for catalog products.
//!
//! A product may carry a discount payload of the form
//!
//! ```json
//! { "enabled": true, "kind": { "percent": 20 }, "window": { "start": "...", "end": "..." } }
//! ```
//!
//! where `kind` is either `{"percent": n}` or `{"fixed": cents}` and both
//! window bounds are optional and inclusive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::ProductRecord;

use crate::Money;

/// How a discount reduces the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Whole-number percentage off the base price.
    Percent(u32),

    /// Fixed amount off the base price.
    Fixed(Money),
}

/// Time window in which a discount applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl ActiveWindow {
    /// Returns true if `now` falls inside the window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start
            && now < start
        {
            return false;
        }
        if let Some(end) = self.end
            && now > end
        {
            return false;
        }
        true
    }
}

/// A product discount as configured in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(default)]
    pub enabled: bool,
    pub kind: DiscountKind,
    #[serde(default)]
    pub window: ActiveWindow,
}

impl Discount {
    /// Parses a raw catalog payload.
    ///
    /// A missing or `null` payload means no discount. A malformed payload is
    /// logged and also treated as no discount.
    pub fn parse(raw: Option<&serde_json::Value>) -> Option<Discount> {
        let raw = raw?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(discount) => Some(discount),
            Err(e) => {
                tracing::warn!(error = %e, payload = %raw, "Ignoring malformed discount");
                None
            }
        }
    }

    /// Returns true if the discount applies at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.window.contains(now)
    }

    /// Applies the discount to a base price, ignoring the window.
    pub fn apply(&self, base: Money) -> Money {
        match self.kind {
            DiscountKind::Percent(percent) => {
                let kept = i128::from(100 - percent.min(100));
                let cents = base.cents().max(0);
                // Never larger than `cents`, so it always fits back into i64
                let discounted = (i128::from(cents) * kept + 50) / 100;
                Money::from_cents(i64::try_from(discounted).unwrap_or(cents))
            }
            DiscountKind::Fixed(amount) => base.saturating_sub(amount),
        }
    }
}

/// Returns the price charged at `now` for a base price and optional discount.
pub fn effective_price(base: Money, discount: Option<&Discount>, now: DateTime<Utc>) -> Money {
    match discount {
        Some(discount) if discount.is_active(now) => discount.apply(base),
        _ => base,
    }
}

/// Resolves the effective unit price of a catalog product at `now`.
pub fn product_price(product: &ProductRecord, now: DateTime<Utc>) -> Money {
    let discount = Discount::parse(product.discount.as_ref());
    effective_price(
        Money::from_cents(product.base_price_cents),
        discount.as_ref(),
        now,
    )
}
