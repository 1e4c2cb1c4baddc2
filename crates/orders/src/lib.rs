//! Order placement and stock consistency protocols.
//!
//! Three operations mutate the stock ledger:
//! 1. Placing an order reserves each line with an atomic conditional
//!    decrement, compensating already reserved lines on failure.
//! 2. Editing an order diffs the new lines against the persisted ones and
//!    commits the stock delta together with the order in one scope.
//! 3. Cancelling a pending order restores every line in one scope.
//!
//! `OrderService` ties them together with reads and change notification.

pub mod cancellation;
pub mod error;
pub mod notifier;
pub mod reconciler;
pub mod reservation;
pub mod service;
pub mod views;

pub use cancellation::CancellationHandler;
pub use error::{OrderServiceError, Result};
pub use notifier::{NoopNotifier, RecordingNotifier, TracingNotifier};
pub use reconciler::{EditOrder, EditOutcome, EditReconciler};
pub use reservation::{CompensationLog, CompensationReport, Reservation, ReservationSaga};
pub use service::{OrderService, Page, PlaceOrder};
pub use views::{OrderItemView, OrderView, build_view, build_views};
