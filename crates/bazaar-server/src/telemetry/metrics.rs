// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::http::StatusCode;
use bazaar_api::V1_ROUTES;
use tokio::sync::Mutex;

pub(crate) const METRIC_SUBSYSTEM: &str = "bazaar";

#[derive(Debug, Default, Clone, Copy)]
struct LatencySum {
    count: u64,
    sum_ns: u128,
}

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<BTreeMap<(String, String, u16), u64>>,
    latency: Mutex<BTreeMap<String, LatencySum>>,
    pub(crate) rate_limited_total: AtomicU64,
    pub(crate) drained_total: AtomicU64,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(
        &self,
        route: &str,
        method: &str,
        status: StatusCode,
        latency: Duration,
    ) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), method.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency.lock().await;
        let entry = latency_map.entry(route.to_string()).or_default();
        entry.count += 1;
        entry.sum_ns += latency.as_nanos();
    }

    pub(crate) async fn render(&self, body: &mut String) {
        let counts = self.counts.lock().await.clone();
        body.push_str("# TYPE bazaar_http_requests_total counter\n");
        for ((route, method, status), count) in counts {
            let _ = writeln!(
                body,
                "{METRIC_SUBSYSTEM}_http_requests_total{{route=\"{route}\",method=\"{method}\",status=\"{status}\"}} {count}"
            );
        }
        let latency = self.latency.lock().await.clone();
        body.push_str("# TYPE bazaar_http_request_duration_seconds summary\n");
        for (route, sum) in latency {
            let _ = writeln!(
                body,
                "{METRIC_SUBSYSTEM}_http_request_duration_seconds_sum{{route=\"{route}\"}} {:.6}",
                sum.sum_ns as f64 / 1_000_000_000.0
            );
            let _ = writeln!(
                body,
                "{METRIC_SUBSYSTEM}_http_request_duration_seconds_count{{route=\"{route}\"}} {}",
                sum.count
            );
        }
        for (name, value) in [
            ("rate_limited_total", &self.rate_limited_total),
            ("drained_requests_total", &self.drained_total),
        ] {
            let _ = writeln!(
                body,
                "{METRIC_SUBSYSTEM}_{name} {}",
                value.load(Ordering::Relaxed)
            );
        }
    }
}

/// Maps a concrete path onto its route template so ids do not explode label
/// cardinality. Unknown paths collapse into one label.
#[must_use]
pub(crate) fn route_label(path: &str) -> String {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    V1_ROUTES
        .iter()
        .map(|(_, template, _, _)| *template)
        .find(|template| {
            let parts: Vec<&str> = template.split('/').collect();
            parts.len() == segments.len()
                && parts
                    .iter()
                    .zip(&segments)
                    .all(|(t, s)| t.starts_with('{') || t == s)
        })
        .map_or_else(|| "unmatched".to_string(), str::to_string)
}
