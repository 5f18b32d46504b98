// SPDX-License-Identifier: Apache-2.0

//! Health, metrics and self-description.

use std::fmt::Write as _;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bazaar_api::{openapi_v1_spec, ApiError, VersionDto, API_VERSION};
use tracing::warn;

use crate::error::HttpError;
use crate::http::run_blocking;
use crate::telemetry::metrics::METRIC_SUBSYSTEM;
use crate::{AppState, CRATE_NAME};

pub(crate) async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Ready while accepting traffic and the database answers.
pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    if !state.accepting_requests.load(Ordering::Relaxed) {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    match run_blocking(&state, |store, _| Ok(store.ping()?)).await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            warn!("readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
        }
    }
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut body = String::new();
    state.metrics.render(&mut body).await;
    let _ = writeln!(
        body,
        "{METRIC_SUBSYSTEM}_rate_limiter_tracked_keys {}",
        state.rate_limiter.tracked_keys().await
    );
    let _ = writeln!(
        body,
        "{METRIC_SUBSYSTEM}_accepting_requests {}",
        u8::from(state.accepting_requests.load(Ordering::Relaxed))
    );
    let mut resp = (StatusCode::OK, body).into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    resp
}

pub(crate) async fn version_handler() -> Response {
    let mut resp = Json(VersionDto {
        service: CRATE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_version: API_VERSION.to_string(),
    })
    .into_response();
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=30"),
    );
    resp
}

pub(crate) async fn openapi_handler() -> impl IntoResponse {
    Json(openapi_v1_spec())
}

pub(crate) async fn fallback_handler(uri: Uri) -> HttpError {
    HttpError(ApiError::not_found(format!("no route for {}", uri.path())))
}
