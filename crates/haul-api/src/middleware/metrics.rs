//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Load and trip gauges by status are refreshed on each
//! `/metrics` scrape (pull model); see the handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Path label for requests that matched no route.
const UNMATCHED: &str = "unmatched";

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    loads_total: GaugeVec,
    trips_total: GaugeVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("haul_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "haul_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )?;

        let http_errors_total = IntCounterVec::new(
            Opts::new("haul_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;

        let loads_total = GaugeVec::new(
            Opts::new("haul_loads_total", "Loads by lifecycle status"),
            &["status"],
        )?;

        let trips_total = GaugeVec::new(
            Opts::new("haul_trips_total", "Trips by lifecycle status"),
            &["status"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(loads_total.clone()))?;
        registry.register(Box::new(trips_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                loads_total,
                trips_total,
            }),
        })
    }

    /// Total request count across all labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total error count across all labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    pub fn loads_total(&self) -> &GaugeVec {
        &self.inner.loads_total
    }

    pub fn trips_total(&self) -> &GaugeVec {
        &self.inner.trips_total
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Label for a request: the route template it matched, such as
/// `/v1/trips/:id`, or `unmatched` when no route did.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED.to_string(), |matched| matched.as_str().to_string())
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = route_label(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_count_only_4xx_and_5xx() {
        let m = ApiMetrics::new().unwrap();
        for _ in 0..5 {
            m.record_request("GET", "/v1/loads", 200, 0.01);
        }
        m.record_request("POST", "/v1/trips/{id}/complete", 409, 0.02);
        m.record_request("GET", "/v1/trips/{id}", 404, 0.01);
        assert_eq!(m.requests(), 7);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new().unwrap();
        let clone = m.clone();
        m.record_request("GET", "/test", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn gather_and_encode_includes_status_gauges() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/v1/loads", 200, 0.01);
        m.loads_total().with_label_values(&["in_transit"]).set(3.0);
        m.trips_total().with_label_values(&["en_route"]).set(1.0);

        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("haul_http_requests_total"));
        assert!(output.contains("haul_http_request_duration_seconds"));
        assert!(output.contains("haul_loads_total{status=\"in_transit\"} 3"));
        assert!(output.contains("haul_trips_total{status=\"en_route\"} 1"));
    }

    #[test]
    fn request_without_route_is_unmatched() {
        let request = Request::builder()
            .uri("/v1/trips/550e8400-e29b-41d4-a716-446655440000/anything")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), UNMATCHED);
    }

    #[tokio::test]
    async fn matched_requests_are_labelled_by_route_template() {
        let metrics = ApiMetrics::new().unwrap();
        let app = Router::new()
            .route("/v1/trips/:id", get(|| async { "ok" }))
            .layer(from_fn(metrics_middleware))
            .layer(Extension(metrics.clone()));

        for id in ["a1", "b2", "not-a-uuid"] {
            let request = Request::builder()
                .uri(format!("/v1/trips/{id}"))
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let output = metrics.gather_and_encode().unwrap();
        assert!(output.contains("path=\"/v1/trips/:id\""));
        assert!(!output.contains("not-a-uuid"));
        assert_eq!(metrics.requests(), 3);
    }
}
