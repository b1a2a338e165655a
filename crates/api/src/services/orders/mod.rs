//! Order placement and fulfillment workflow.
//!
//! This is the one part of the system with real invariants:
//!
//! - stock never goes negative, even under concurrent placement
//! - `total == subtotal + shipping_cost + tax`, derived server-side
//! - an order and its items are created atomically, or not at all
//!
//! Validation is fail-fast and ordered: the empty-cart and quantity checks
//! run before any store access, then lines are processed strictly in input
//! order so the first offending line is the one reported. Everything from
//! the first product lookup to the final insert happens inside one unit of
//! work; any failure drops the unit of work and with it every staged stock
//! decrement.

pub mod error;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartwright_core::{OrderId, OrderStatus, UserId};

use crate::db::{Catalog, Ledger, NewOrder, NewOrderItem, OrderStore, OrderTx};
use crate::models::{NewOrderRequest, Order, UpdateOrderStatusRequest};

pub use error::OrderError;

/// The authenticated caller, as established by the fronting auth layer.
///
/// Passed explicitly into every operation; the workflow never reads
/// ambient session state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// Order workflow over an [`OrderStore`] backend.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Place an order for an authenticated user.
    ///
    /// Prices each cart line against the catalog at call time, reserves
    /// stock, and persists the order with one item per line as a single
    /// all-or-nothing unit. On success the product stock is reduced and
    /// the fully materialized order is returned; on any failure no stock
    /// decrement from this request survives.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty cart, a non-positive quantity, a
    ///   missing payment method or shipping address, or negative
    ///   shipping/tax amounts. Detected before any store access.
    /// - `ProductNotFound` / `InsufficientStock` for the first offending
    ///   cart line in input order.
    /// - `Repository` if the store itself fails.
    #[instrument(skip(self, request), fields(user_id = %user_id, lines = request.items.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: NewOrderRequest,
    ) -> Result<Order, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::InvalidRequest(
                "order must contain at least one item".to_owned(),
            ));
        }
        if request.items.iter().any(|line| line.quantity <= 0) {
            return Err(OrderError::InvalidRequest(
                "item quantity must be positive".to_owned(),
            ));
        }
        if request.payment_method.trim().is_empty() {
            return Err(OrderError::InvalidRequest(
                "payment method is required".to_owned(),
            ));
        }
        if request.shipping_address.is_null() {
            return Err(OrderError::InvalidRequest(
                "shipping address is required".to_owned(),
            ));
        }

        let shipping_cost = request.shipping_cost.unwrap_or(Decimal::ZERO);
        let tax = request.tax.unwrap_or(Decimal::ZERO);
        if shipping_cost < Decimal::ZERO || tax < Decimal::ZERO {
            return Err(OrderError::InvalidRequest(
                "shipping cost and tax must be non-negative".to_owned(),
            ));
        }

        let mut tx = self.store.begin().await?;

        let mut subtotal = Decimal::ZERO;
        let mut new_items = Vec::with_capacity(request.items.len());
        let mut snapshots = Vec::with_capacity(request.items.len());

        for line in &request.items {
            let Some(mut product) = tx.find_product(line.product_id).await? else {
                return Err(OrderError::ProductNotFound(line.product_id));
            };

            if product.stock < line.quantity
                || !tx.decrement_stock(product.id, line.quantity).await?
            {
                return Err(OrderError::InsufficientStock {
                    product: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            product.stock -= line.quantity;
            subtotal += product.price * Decimal::from(line.quantity);
            new_items.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                price: product.price,
            });
            snapshots.push(product);
        }

        let total = subtotal + shipping_cost + tax;
        let mut order = tx
            .insert_order_with_items(
                NewOrder {
                    user_id,
                    status: OrderStatus::Processing,
                    subtotal,
                    shipping_cost,
                    tax,
                    total,
                    shipping_address: request.shipping_address,
                    payment_method: request.payment_method,
                },
                new_items,
            )
            .await?;
        tx.commit().await?;

        for (item, product) in order.items.iter_mut().zip(snapshots) {
            item.product = Some(product);
        }

        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(order)
    }

    /// Fetch an order, enforcing ownership.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` for an unknown id and `PermissionDenied`
    /// when the caller is neither the order's owner nor an admin.
    pub async fn get_order(&self, identity: Identity, id: OrderId) -> Result<Order, OrderError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        if order.user_id != identity.user_id && !identity.is_admin {
            return Err(OrderError::PermissionDenied);
        }

        Ok(order)
    }

    /// Update an order's status and, optionally, its tracking number.
    ///
    /// Any transition between known statuses is accepted, and cancellation
    /// does not restock the ordered products.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` for an unknown id.
    #[instrument(skip(self, request), fields(order_id = %id, status = %request.status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        request: UpdateOrderStatusRequest,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .update_order_status(id, request.status, request.tracking_number)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        tracing::info!(status = %order.status, "order status updated");
        Ok(order)
    }
}
