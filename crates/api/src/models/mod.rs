//! Domain models and request payloads.
//!
//! All models serialize with camelCase keys, matching the wire format the
//! storefront clients consume.

pub mod order;
pub mod product;

pub use order::{CartLine, NewOrderRequest, Order, OrderItem, UpdateOrderStatusRequest};
pub use product::Product;
