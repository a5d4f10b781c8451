//! Error kind to transport status mapping.
//!
//! Each service error converts into an [`ApiError`] carrying the HTTP status and the message shown
//! to the client. Anything the caller cannot act on becomes a 500 with a fixed message, and the
//! real cause goes to the log.

use crate::framework::StoreError;
use crate::orders::OrderError;
use crate::products::ProductError;
use crate::users::UserError;
use http::StatusCode;
use serde::Serialize;
use tracing::error;

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn internal(cause: &dyn std::fmt::Display) -> Self {
        error!(error = %cause, "Unhandled error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.detail.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.detail)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::LockTimeout { .. } | StoreError::RowBusy { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "Resource busy, retry later")
            }
            other => Self::internal(&other),
        }
    }
}

impl From<ProductError> for ApiError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            ProductError::NotDeleted(_)
            | ProductError::Validation(_)
            | ProductError::InsufficientStock { .. } => {
                Self::new(StatusCode::BAD_REQUEST, e.to_string())
            }
            ProductError::StockOverflow { .. } => Self::internal(&e),
            ProductError::Store(store) => store.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::ProductNotFound(_) | OrderError::OrderNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, e.to_string())
            }
            OrderError::InsufficientStock { .. }
            | OrderError::OrderAlreadyCancelled(_)
            | OrderError::InvalidOrderStatusTransition(_)
            | OrderError::InvalidQuantity => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            OrderError::StockOverflow(_) => Self::internal(&e),
            OrderError::Store(store) => store.into(),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            UserError::AlreadyExists(_) | UserError::Validation(_) => {
                Self::new(StatusCode::BAD_REQUEST, e.to_string())
            }
            UserError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, e.to_string()),
            UserError::Unauthorized => Self::new(StatusCode::FORBIDDEN, e.to_string()),
            UserError::Password(_) | UserError::Token(_) => Self::internal(&e),
            UserError::Store(store) => store.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderId, ProductId, UserId};
    use crate::orders::TransitionRejection;

    #[test]
    fn test_order_kinds_map_to_statuses() {
        let cases = [
            (OrderError::ProductNotFound(ProductId(1)), 404, "Product not found"),
            (OrderError::OrderNotFound(OrderId(1)), 404, "Order not found"),
            (
                OrderError::InsufficientStock {
                    product_id: ProductId(1),
                    requested: 2,
                    available: 1,
                },
                400,
                "Not enough stock",
            ),
            (OrderError::OrderAlreadyCancelled(OrderId(1)), 400, "Order already cancelled"),
            (
                OrderError::InvalidOrderStatusTransition(TransitionRejection::NotAuthorized),
                400,
                "Not authorized",
            ),
            (
                OrderError::InvalidOrderStatusTransition(TransitionRejection::Delivered),
                400,
                "Delivered orders cannot be modified",
            ),
        ];
        for (error, status, detail) in cases {
            let api = ApiError::from(error);
            assert_eq!(api.status.as_u16(), status);
            assert_eq!(api.detail, detail);
        }
    }

    #[test]
    fn test_identity_kinds_map_to_statuses() {
        assert_eq!(
            ApiError::from(UserError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(UserError::Unauthorized).status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(UserError::NotFound(UserId(3))).status,
            StatusCode::NOT_FOUND
        );
        let dup = ApiError::from(UserError::AlreadyExists("a@example.com".to_string()));
        assert_eq!(dup.status, StatusCode::BAD_REQUEST);
        assert_eq!(dup.detail, "Email already registered");
    }

    #[test]
    fn test_product_not_deleted_is_bad_request() {
        let api = ApiError::from(ProductError::NotDeleted(ProductId(2)));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.detail, "Product is not deleted");
    }

    #[test]
    fn test_store_failures_hide_details() {
        let api = ApiError::from(OrderError::Store(StoreError::Closed));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body().detail, "Internal Server Error");

        let busy = ApiError::from(ProductError::Store(StoreError::LockTimeout {
            table: "products",
            id: "product_1".to_string(),
        }));
        assert_eq!(busy.status, StatusCode::SERVICE_UNAVAILABLE);

        let taken = ApiError::from(UserError::Store(StoreError::RowBusy {
            table: "orders",
            id: "order_4".to_string(),
        }));
        assert_eq!(taken.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_body_serializes_detail() {
        let body = ApiError::from(UserError::InvalidCredentials).body();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "detail": "Invalid credentials" })
        );
    }
}
