//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers should
//! return `Result<T, AppError>`.
//!
//! Domain errors map to a machine-readable `code` plus the triggering
//! detail (e.g. the offending product id); internal errors never leak
//! details to the client.

use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::orders::OrderError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order workflow failure.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Order(OrderError::Repository(_))
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                OrderError::ProductNotFound(_) | OrderError::OrderNotFound => {
                    StatusCode::NOT_FOUND
                }
                OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
                OrderError::PermissionDenied => StatusCode::FORBIDDEN,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            Self::Order(OrderError::InvalidRequest(message)) => json!({
                "code": "invalid_request",
                "message": message,
            }),
            Self::Order(OrderError::ProductNotFound(id)) => json!({
                "code": "product_not_found",
                "message": format!("product {id} not found"),
                "productId": id,
            }),
            Self::Order(OrderError::InsufficientStock {
                product,
                requested,
                available,
            }) => json!({
                "code": "insufficient_stock",
                "message": format!("not enough stock for product {product}"),
                "productId": product,
                "requested": requested,
                "available": available,
            }),
            Self::Order(OrderError::OrderNotFound) => json!({
                "code": "order_not_found",
                "message": "order not found",
            }),
            Self::Order(OrderError::PermissionDenied) => json!({
                "code": "permission_denied",
                "message": "you do not have permission to access this order",
            }),
            Self::Order(OrderError::Repository(_)) | Self::Database(_) | Self::Internal(_) => {
                json!({
                    "code": "internal_error",
                    "message": "internal server error",
                })
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), axum::Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON extractor and response wrapping [`axum::Json`].
///
/// Extraction failures (malformed body, unknown enum value, wrong content
/// type) map onto the standard `{code, message}` error body instead of
/// axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Order(OrderError::InvalidRequest(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use cartwright_core::ProductId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(OrderError::InvalidRequest("empty cart".to_owned()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::ProductNotFound(ProductId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                OrderError::InsufficientStock {
                    product: ProductId::new(1),
                    requested: 3,
                    available: 2,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::OrderNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrderError::PermissionDenied.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_stock_body_carries_detail() {
        let err: AppError = OrderError::InsufficientStock {
            product: ProductId::new(7),
            requested: 4,
            available: 1,
        }
        .into();

        let body = err.body();
        assert_eq!(body["code"], "insufficient_stock");
        assert_eq!(body["productId"], 7);
        assert_eq!(body["requested"], 4);
        assert_eq!(body["available"], 1);
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = AppError::Internal("connection string was postgres://secret".to_owned());
        let body = err.body();
        assert_eq!(body["message"], "internal server error");
    }
}
