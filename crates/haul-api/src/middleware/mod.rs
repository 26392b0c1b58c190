//! # Middleware Stack
//!
//! - [`metrics`]: Prometheus request metrics and status gauges.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly and
//! authentication lives in [`crate::auth`].

pub mod metrics;
