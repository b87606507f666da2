//! HTTP API server for the StockLab inventory service.
//!
//! Exposes login and the stock-movement endpoints under
//! [`API_PREFIX`], with structured logging (tracing) and Prometheus
//! metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use accounts::{AuthService, CredentialStore};
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use ledger::{StockLedger, StockService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Path every route is nested under.
pub const API_PREFIX: &str = "/stocklab-api/v1";

/// Shared application state accessible from all handlers.
pub struct AppState<L: StockLedger, C: CredentialStore> {
    pub stock: StockService<L>,
    pub auth: AuthService<C>,
}

impl<L: StockLedger, C: CredentialStore> AppState<L, C> {
    pub fn new(stock: StockService<L>, auth: AuthService<C>) -> Self {
        Self { stock, auth }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, C>(state: Arc<AppState<L, C>>, metrics_handle: PrometheusHandle) -> Router
where
    L: StockLedger + 'static,
    C: CredentialStore + 'static,
{
    let tokens = Arc::new(state.auth.tokens().clone());

    let protected = Router::new()
        .route(
            "/transactions/create",
            post(routes::transactions::create::<L, C>),
        )
        .route("/transactions", get(routes::transactions::list::<L, C>))
        .route_layer(middleware::from_fn_with_state(tokens, auth::require_bearer));

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::scrape))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/health", get(routes::health::check))
        .route("/login", post(routes::auth::login::<L, C>))
        .merge(protected)
        .with_state(state)
        .merge(metrics_router);

    Router::new()
        .nest(API_PREFIX, api)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
