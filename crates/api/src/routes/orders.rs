//! Order route handlers.
//!
//! Thin glue over [`OrderService`]: parse, call, serialize. Request
//! bodies are fully typed before the service ever sees them, so the
//! workflow never handles a malformed structure.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use cartwright_core::OrderId;

use crate::error::{Json, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{NewOrderRequest, Order, UpdateOrderStatusRequest};
use crate::state::AppState;

/// Place a new order for the authenticated user.
///
/// # Errors
///
/// Returns `AppError::Order` for validation, missing-product, and
/// insufficient-stock failures; nothing is persisted on any of them.
pub async fn create(
    RequireAuth(identity): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<NewOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().place_order(identity.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch an order by id. Owner or admin only.
///
/// # Errors
///
/// Returns `AppError::Order` if the order is missing or the caller does
/// not own it.
pub async fn show(
    RequireAuth(identity): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .get_order(identity, OrderId::new(id))
        .await?;
    Ok(Json(order))
}

/// Update an order's status and tracking number. Admin only.
///
/// # Errors
///
/// Returns `AppError::Order` if the order does not exist.
pub async fn update_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_order_status(OrderId::new(id), body)
        .await?;
    Ok(Json(order))
}
