// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bazaar_api::{ApiError, PageDto};
use bazaar_store::{IdCursor, Page, Store};
use serde_json::json;

use crate::error::ServiceError;
use crate::AppState;

pub(crate) mod account;
pub(crate) mod admin;
pub(crate) mod cart;
pub(crate) mod extract;
pub(crate) mod ops;
pub(crate) mod orders;
pub(crate) mod request_tracing;
pub(crate) mod seller;
pub(crate) mod storefront;

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let mut resp = (status, Json(json!({ "error": err }))).into_response();
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("3"));
    }
    resp
}

/// Runs blocking store work off the async executor with the current clock
/// reading in unix millis.
pub(crate) async fn run_blocking<T, F>(state: &AppState, f: F) -> Result<T, ServiceError>
where
    F: FnOnce(&Store, i64) -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let now = state.clock.now_millis();
    tokio::task::spawn_blocking(move || f(&store, now))
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {e}")))?
}

pub(crate) fn path_id<T: FromStr>(raw: &str, name: &str) -> Result<T, ApiError> {
    raw.parse::<T>()
        .map_err(|_| ApiError::invalid_param(name, raw))
}

pub(crate) fn id_cursor(cursor: Option<&str>) -> Result<Option<IdCursor>, ApiError> {
    cursor
        .map(|raw| IdCursor::decode(raw).map_err(|_| ApiError::invalid_cursor(raw)))
        .transpose()
}

pub(crate) fn page_dto<T>(page: Page<T>) -> PageDto<T> {
    PageDto {
        items: page.items,
        next_cursor: page.next_cursor,
    }
}

pub(crate) fn created<T: serde::Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub(crate) fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
