// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorCode {
    InvalidQueryParameter,
    ValidationFailed,
    InvalidCursor,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    DuplicateOrder,
    InvalidTransition,
    PriceMismatch,
    OutOfStock,
    ProductUnavailable,
    PayloadTooLarge,
    RateLimited,
    NotReady,
    Internal,
}

impl ApiErrorCode {
    pub const ALL: [Self; 16] = [
        Self::InvalidQueryParameter,
        Self::ValidationFailed,
        Self::InvalidCursor,
        Self::Unauthenticated,
        Self::Forbidden,
        Self::NotFound,
        Self::Conflict,
        Self::DuplicateOrder,
        Self::InvalidTransition,
        Self::PriceMismatch,
        Self::OutOfStock,
        Self::ProductUnavailable,
        Self::PayloadTooLarge,
        Self::RateLimited,
        Self::NotReady,
        Self::Internal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQueryParameter => "InvalidQueryParameter",
            Self::ValidationFailed => "ValidationFailed",
            Self::InvalidCursor => "InvalidCursor",
            Self::Unauthenticated => "Unauthenticated",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::DuplicateOrder => "DuplicateOrder",
            Self::InvalidTransition => "InvalidTransition",
            Self::PriceMismatch => "PriceMismatch",
            Self::OutOfStock => "OutOfStock",
            Self::ProductUnavailable => "ProductUnavailable",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::RateLimited => "RateLimited",
            Self::NotReady => "NotReady",
            Self::Internal => "Internal",
        }
    }
}

/// Body of the `{"error": ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: "req-unknown".to_string(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidQueryParameter,
            format!("invalid query parameter: {name}"),
            json!({"field_errors":[{"parameter": name, "reason": "invalid", "value": value}]}),
        )
    }

    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ApiErrorCode::ValidationFailed,
            "validation failed",
            json!({"reason": message}),
        )
    }

    #[must_use]
    pub fn invalid_cursor(value: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidCursor,
            "invalid cursor",
            json!({"cursor": value}),
        )
    }

    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthenticated, message, json!({}))
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message, json!({}))
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message, json!({}))
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}))
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}))
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiError>();
};
