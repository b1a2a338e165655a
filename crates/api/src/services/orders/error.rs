//! Order workflow error types.

use thiserror::Error;

use cartwright_core::ProductId;

use crate::db::RepositoryError;

/// Errors that can occur during order operations.
///
/// Every variant except `Repository` is detected before any persistent
/// mutation becomes visible; callers never observe a partially placed
/// order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or missing input. No store state was touched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A cart line references a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A cart line asks for more than the product has in stock.
    #[error(
        "insufficient stock for product {product}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product: ProductId,
        requested: i32,
        available: i32,
    },

    /// The referenced order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// The caller is neither the order's owner nor an admin.
    #[error("permission denied")]
    PermissionDenied,

    /// Infrastructure failure. Not retried here; retry is the caller's
    /// decision.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
