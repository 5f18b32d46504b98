// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bazaar_api::{map_error, ApiError, ApiErrorCode};
use bazaar_model::{OrderId, ProductId, ValidationError};
use bazaar_store::{StoreError, StoreErrorCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Failure of a workflow or handler, before it is rendered on the wire.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("cannot move {what} from {from} to {to}")]
    InvalidTransition {
        what: String,
        from: String,
        to: String,
    },
    #[error("unsettled orders already contain these products")]
    DuplicateOrder { orders: Vec<OrderId> },
    #[error("price for product {product} changed")]
    PriceMismatch {
        product: ProductId,
        expected: i64,
        submitted: i64,
    },
    #[error("product {product} has {available} in stock, {requested} requested")]
    OutOfStock {
        product: ProductId,
        available: i64,
        requested: u32,
    },
    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn invalid_transition(
        what: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            what: what.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Store(store) => match store.code {
                StoreErrorCode::NotFound => ApiError::not_found(store.message),
                StoreErrorCode::Conflict => ApiError::conflict(store.message),
                StoreErrorCode::Validation => ApiError::validation_failed(store.message),
                StoreErrorCode::Io | StoreErrorCode::InjectedFault | StoreErrorCode::Internal => {
                    error!(code = store.code.as_str(), "store failure: {}", store.message);
                    ApiError::internal()
                }
            },
            ServiceError::Validation(v) => ApiError::validation_failed(v.0),
            ServiceError::Auth(_) => ApiError::unauthenticated(message),
            ServiceError::Forbidden(_) => ApiError::forbidden(message),
            ServiceError::NotFound(_) => ApiError::not_found(message),
            ServiceError::Conflict(_) => ApiError::conflict(message),
            ServiceError::InvalidTransition { what, from, to } => ApiError::new(
                ApiErrorCode::InvalidTransition,
                message,
                json!({"entity": what, "from": from, "to": to}),
            ),
            ServiceError::DuplicateOrder { orders } => ApiError::new(
                ApiErrorCode::DuplicateOrder,
                message,
                json!({"orders": orders}),
            ),
            ServiceError::PriceMismatch {
                product,
                expected,
                submitted,
            } => ApiError::new(
                ApiErrorCode::PriceMismatch,
                message,
                json!({"product_id": product, "expected": expected, "submitted": submitted}),
            ),
            ServiceError::OutOfStock {
                product,
                available,
                requested,
            } => ApiError::new(
                ApiErrorCode::OutOfStock,
                message,
                json!({"product_id": product, "available": available, "requested": requested}),
            ),
            ServiceError::ProductUnavailable(product) => ApiError::new(
                ApiErrorCode::ProductUnavailable,
                message,
                json!({"product_id": product}),
            ),
            ServiceError::Internal(detail) => {
                error!("internal failure: {detail}");
                ApiError::internal()
            }
        }
    }
}

/// Error carried out of a handler. The request-tracing middleware stamps the
/// request id and renders the `{"error": ...}` envelope.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

pub(crate) type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Clone)]
pub(crate) struct PendingApiError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        Self(err.into())
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        ServiceError::from(err).into()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(map_error(&self.0).status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = crate::http::api_error_response(status, self.0.clone());
        response.extensions_mut().insert(PendingApiError(self.0));
        response
    }
}
