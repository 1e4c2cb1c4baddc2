//! Change notifier implementations.

use std::sync::{Arc, Mutex};

use domain::{ChangeNotifier, OrderChange};

/// Discards every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _change: &OrderChange) {}
}

/// Logs every change at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl ChangeNotifier for TracingNotifier {
    fn notify(&self, change: &OrderChange) {
        tracing::debug!(
            kind = change.kind(),
            order_id = %change.order_id(),
            user_id = %change.user_id(),
            "Order changed"
        );
    }
}

/// Keeps every change in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    changes: Arc<Mutex<Vec<OrderChange>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the changes seen so far.
    pub fn changes(&self) -> Vec<OrderChange> {
        self.changes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.changes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify(&self, change: &OrderChange) {
        self.changes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(change.clone());
    }
}
