//! Domain layer of the ordering engine.
//!
//! This crate is free of I/O and provides:
//! - the `Order` aggregate with its price and stock snapshots
//! - the `OrderStatus` state machine
//! - discount pricing for catalog products
//! - the edit diff planner used to reconcile stock
//! - the `ChangeNotifier` hook for committed changes

pub mod order;
pub mod pricing;

pub use order::{
    ChangeNotifier, EditPlan, LineRequest, Money, Order, OrderChange, OrderError, OrderItem,
    OrderMetadata, OrderStatus, PlannedLine, ShippingInfo, plan_edit, validate_lines,
};
pub use pricing::{ActiveWindow, Discount, DiscountKind, effective_price, product_price};
