//! Order and order item models, plus the request payloads accepted by the
//! order routes.
//!
//! Orders own their items: deleting an order cascades to its items, and
//! items are never created outside of order placement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cartwright_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::Product;

/// A persisted order with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    /// Always `subtotal + shipping_cost + tax`, derived server-side.
    pub total: Decimal,
    /// Opaque structured address blob; the workflow never looks inside it.
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// A single line of a persisted order.
///
/// `price` is the unit price captured at purchase time. `product` is a
/// weak reference resolved at read time; it may be `None` if the product
/// has since been removed from the catalog, and its live price may differ
/// from the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product: Option<Product>,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A (product, quantity) pair submitted for purchase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Request body for `POST /api/orders`.
///
/// `subtotal` and `total` are deliberately absent: totals are re-derived
/// from the catalog, never trusted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub items: Vec<CartLine>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub tax: Option<Decimal>,
}

/// Request body for `PATCH /api/orders/{id}`.
///
/// Unknown status values are rejected by serde before the service layer
/// ever sees the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
}
