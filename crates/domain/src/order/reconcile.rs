//! Per-line diff between a persisted order and a replacement item list.

use std::collections::HashMap;

use common::VariantKey;

use super::{LineRequest, OrderItem};

/// One requested line matched against the persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine<'a> {
    pub key: VariantKey,
    pub quantity: u32,

    /// The persisted line for the same variant, if any.
    pub previous: Option<&'a OrderItem>,

    /// `quantity - previous quantity`; positive means more stock is needed.
    pub diff: i64,
}

/// The result of diffing an edit against the persisted lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan<'a> {
    lines: Vec<PlannedLine<'a>>,
    removed: Vec<&'a OrderItem>,
}

impl<'a> EditPlan<'a> {
    /// Returns the requested lines in request order.
    pub fn lines(&self) -> &[PlannedLine<'a>] {
        &self.lines
    }

    /// Returns persisted lines absent from the request.
    pub fn removed(&self) -> &[&'a OrderItem] {
        &self.removed
    }

    /// Returns the non-zero stock adjustments the edit implies.
    ///
    /// A line that grows by `n` yields `-n`; a line that shrinks or is
    /// removed gives its stock back.
    pub fn stock_deltas(&self) -> Vec<(VariantKey, i64)> {
        let changed = self
            .lines
            .iter()
            .filter(|line| line.diff != 0)
            .map(|line| (line.key.clone(), -line.diff));
        let restored = self
            .removed
            .iter()
            .map(|item| (item.key(), i64::from(item.quantity)));
        changed.chain(restored).collect()
    }

    /// Returns true if the edit leaves every reserved quantity unchanged.
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.lines.iter().all(|line| line.diff == 0)
    }
}

/// Diffs `requested` against the `previous` lines of an order.
///
/// Lines are matched by variant. `requested` is expected to be validated
/// already (no duplicates, positive quantities).
pub fn plan_edit<'a>(previous: &'a [OrderItem], requested: &[LineRequest]) -> EditPlan<'a> {
    let mut by_key: HashMap<VariantKey, &'a OrderItem> =
        previous.iter().map(|item| (item.key(), item)).collect();

    let lines = requested
        .iter()
        .map(|request| {
            let key = request.key();
            let previous = by_key.remove(&key);
            let previous_quantity = previous.map_or(0, |item| i64::from(item.quantity));
            PlannedLine {
                diff: i64::from(request.quantity) - previous_quantity,
                key,
                quantity: request.quantity,
                previous,
            }
        })
        .collect();

    // Keep removals in their original order
    let removed = previous
        .iter()
        .filter(|item| by_key.contains_key(&item.key()))
        .collect();

    EditPlan { lines, removed }
}
