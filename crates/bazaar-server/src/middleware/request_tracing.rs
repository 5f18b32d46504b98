// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use serde_json::json;
use tracing::{info, warn, Instrument};

use crate::error::PendingApiError;
use crate::http::request_tracing::extract_request_id;
use crate::telemetry::metrics::route_label;
use crate::AppState;

/// Outermost layer: assigns the request id, opens the `http.request` span,
/// stamps error envelopes and records request metrics.
pub(crate) async fn request_tracing_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = route_label(request.uri().path());
    let request_id = extract_request_id(request.headers(), &state);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert("x-request-id", value);
    }

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    if let Some(PendingApiError(err)) = response.extensions_mut().remove::<PendingApiError>() {
        let err = err.with_request_id(request_id.clone());
        match serde_json::to_vec(&json!({ "error": err })) {
            Ok(bytes) => {
                response
                    .headers_mut()
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                *response.body_mut() = Body::from(bytes);
            }
            Err(e) => span.in_scope(|| warn!("error envelope encode failed: {e}")),
        }
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    let status = response.status();
    let latency = started.elapsed();
    state
        .metrics
        .observe_request(&route, &method, status, latency)
        .await;
    span.in_scope(|| {
        info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "request completed"
        );
    });
    response
}
