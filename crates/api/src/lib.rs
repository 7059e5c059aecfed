//! HTTP surface and process wiring of the order-fulfillment saga.
//!
//! Exposes order intake and KPI retrieval over REST, with structured
//! logging (tracing) and Prometheus metrics. The saga participants run in
//! the same process and talk over an in-memory bus.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;
pub mod system;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

pub use config::{Config, LogFormat};
pub use error::{ApiError, StartupError};
pub use system::{StoreBackend, System};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/kpi", get(routes::kpi::latest_per_site))
        .route("/kpi/{site}", get(routes::kpi::latest))
        .route("/kpi/{site}/{n}", get(routes::kpi::history))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
