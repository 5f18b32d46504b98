// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    pub schema_ref: &'static str,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidQueryParameter
        | ApiErrorCode::ValidationFailed
        | ApiErrorCode::InvalidCursor => 400,
        ApiErrorCode::Unauthenticated => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Conflict | ApiErrorCode::DuplicateOrder | ApiErrorCode::InvalidTransition => {
            409
        }
        ApiErrorCode::PayloadTooLarge => 413,
        ApiErrorCode::PriceMismatch
        | ApiErrorCode::OutOfStock
        | ApiErrorCode::ProductUnavailable => 422,
        ApiErrorCode::RateLimited => 429,
        ApiErrorCode::NotReady => 503,
        ApiErrorCode::Internal => 500,
    };

    ApiErrorMapping {
        status_code,
        schema_ref: API_ERROR_SCHEMA_REF,
    }
}
