//! # haul-api: Axum API Services for the Haul Stack
//!
//! HTTP surface over [`haul_dispatch::Dispatcher`]: load and trip
//! lifecycles, trip rosters, expenses, settlement previews, fleet records,
//! and compliance reports.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                  | Domain                 |
//! |-------------------------------|-------------------------|------------------------|
//! | `/v1/loads/*`                 | [`routes::loads`]       | Load lifecycle         |
//! | `/v1/trips/*`                 | [`routes::trips`]       | Trips, roster, money   |
//! | `/v1/expenses/*`              | [`routes::trips`]       | Expense removal        |
//! | `/v1/drivers`, `/v1/trucks`, `/v1/trailers` | [`routes::fleet`] | Fleet records |
//! | `/v1/partnership-documents`   | [`routes::fleet`]       | Partner paperwork      |
//! | `/v1/compliance/*`            | [`routes::compliance`]  | Expiration reports     |
//!
//! Every `/v1/*` request names its owning account in the `x-owner-id`
//! header. Records owned by another account answer 404.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = if state.config.metrics_enabled {
        match ApiMetrics::new() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                tracing::error!("failed to register Prometheus metrics, serving without them: {e}");
                None
            }
        }
    } else {
        None
    };

    let mut api = Router::new()
        .merge(routes::loads::router())
        .merge(routes::trips::router())
        .merge(routes::fleet::router())
        .merge(routes::compliance::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if let Some(metrics) = &metrics {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if let Some(metrics) = metrics {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: Prometheus metrics scrape endpoint.
///
/// Refreshes the load and trip status gauges from the ledger, then encodes
/// every registered metric in the Prometheus text format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    metrics.loads_total().reset();
    for (status, count) in state.dispatcher.load_status_counts() {
        metrics
            .loads_total()
            .with_label_values(&[status.as_str()])
            .set(count as f64);
    }

    metrics.trips_total().reset();
    for (status, count) in state.dispatcher.trip_status_counts() {
        metrics
            .trips_total()
            .with_label_values(&[status.as_str()])
            .set(count as f64);
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Returns 503 while the roster lock is held for writing or the database
/// (when configured) does not answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let roster_free = state.dispatcher.ledger().roster.try_read().is_some();
    if !roster_free {
        return (StatusCode::SERVICE_UNAVAILABLE, "roster locked").into_response();
    }

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
