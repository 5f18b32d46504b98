// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bazaar_api::{ApiError, ApiErrorCode};
use serde_json::json;
use tracing::warn;

use crate::error::HttpError;
use crate::AppState;

const ANONYMOUS_CLIENT: &str = "anonymous";

fn is_ops_endpoint(path: &str) -> bool {
    matches!(path, "/healthz" | "/readyz" | "/metrics")
}

fn normalized_header_value(headers: &HeaderMap, key: &str, max_len: usize) -> Option<String> {
    let raw = headers.get(key)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > max_len {
        return None;
    }
    Some(raw.to_string())
}

pub(crate) fn normalized_forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    if first.is_empty() || first.len() > 64 {
        return None;
    }
    if first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b':' || b == b'-')
    {
        Some(first.to_string())
    } else {
        None
    }
}

/// Refuses new work once shutdown has begun; liveness and metrics stay up.
pub(crate) async fn drain_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if !state.accepting_requests.load(Ordering::Relaxed) && path != "/healthz" && path != "/metrics"
    {
        state.metrics.drained_total.fetch_add(1, Ordering::Relaxed);
        return HttpError(ApiError::new(
            ApiErrorCode::NotReady,
            "server draining; refusing new requests",
            json!({}),
        ))
        .into_response();
    }
    next.run(req).await
}

pub(crate) async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_ops_endpoint(req.uri().path()) || req.method() == Method::OPTIONS {
        return next.run(req).await;
    }
    let client = normalized_forwarded_for(req.headers())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string());
    if !state
        .rate_limiter
        .allow(&client, &state.api.rate_limit_per_ip)
        .await
    {
        state.metrics.rate_limited_total.fetch_add(1, Ordering::Relaxed);
        warn!(client = %client, "rate limited");
        return HttpError(ApiError::new(
            ApiErrorCode::RateLimited,
            "rate limit exceeded",
            json!({"client": client}),
        ))
        .into_response();
    }
    next.run(req).await
}

pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = normalized_header_value(req.headers(), "origin", 256);
    let allowed = origin.as_ref().filter(|o| {
        state
            .api
            .cors_allowed_origins
            .iter()
            .any(|x| x.as_str() == "*" || x == *o)
    });
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(origin_value) = allowed {
            if let Ok(v) = HeaderValue::from_str(origin_value) {
                resp.headers_mut().insert("access-control-allow-origin", v);
            }
            resp.headers_mut().insert(
                "access-control-allow-methods",
                HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
            );
            resp.headers_mut().insert(
                "access-control-allow-headers",
                HeaderValue::from_static("authorization,content-type,x-request-id"),
            );
            resp.headers_mut()
                .insert("access-control-max-age", HeaderValue::from_static("600"));
        }
        return resp;
    }
    let allowed = allowed.cloned();
    let mut resp = next.run(req).await;
    if let Some(origin_value) = allowed {
        if let Ok(v) = HeaderValue::from_str(&origin_value) {
            resp.headers_mut().insert("access-control-allow-origin", v);
        }
        resp.headers_mut()
            .insert("vary", HeaderValue::from_static("Origin"));
        resp.headers_mut().insert(
            "access-control-expose-headers",
            HeaderValue::from_static("x-request-id,retry-after"),
        );
    }
    resp
}
