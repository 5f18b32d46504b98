// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::Ordering;

use axum::http::HeaderMap;

use crate::AppState;

const MAX_REQUEST_ID_BYTES: usize = 128;

/// Honours a sane inbound `x-request-id`, otherwise mints `req-{counter:016x}`.
#[must_use]
pub(crate) fn extract_request_id(headers: &HeaderMap, state: &AppState) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_BYTES)
        .map(ToString::to_string)
        .unwrap_or_else(|| {
            let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
            format!("req-{id:016x}")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn propagates_or_mints_request_ids() {
        let state = crate::AppState::for_tests();
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-abc"));
        assert_eq!(extract_request_id(&headers, &state), "req-abc");

        let minted = extract_request_id(&HeaderMap::new(), &state);
        let next = extract_request_id(&HeaderMap::new(), &state);
        assert!(minted.starts_with("req-"));
        assert_eq!(minted.len(), 4 + 16);
        assert_ne!(minted, next);
    }
}
