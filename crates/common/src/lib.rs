//! Identifier types shared by the store, domain and service layers.

pub mod types;

pub use types::{ColorId, OrderId, ProductId, SizeId, UserId, VariantKey};
