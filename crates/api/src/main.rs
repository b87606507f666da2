//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use accounts::{AuthService, InMemoryCredentialStore, PostgresCredentialStore, TokenIssuer};
use api::config::Config;
use api::{AppState, seed};
use ledger::{InMemoryStockLedger, PostgresStockLedger, StockService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve(listener: TcpListener, app: axum::Router) {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn run_postgres(
    config: &Config,
    url: &str,
    tokens: TokenIssuer,
    metrics_handle: PrometheusHandle,
    listener: TcpListener,
) {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .expect("failed to connect to database");
    tracing::info!(max_connections = config.db_max_connections, "connected to database");

    let ledger = PostgresStockLedger::new(pool.clone());
    ledger
        .run_migrations()
        .await
        .expect("failed to run migrations");

    let state = Arc::new(AppState::new(
        StockService::with_deadline(ledger, config.request_timeout),
        AuthService::with_deadline(
            PostgresCredentialStore::new(pool.clone()),
            tokens,
            config.request_timeout,
        ),
    ));

    serve(listener, api::create_app(state, metrics_handle)).await;

    pool.close().await;
    tracing::info!("database pool closed");
}

async fn run_in_memory(
    config: &Config,
    tokens: TokenIssuer,
    metrics_handle: PrometheusHandle,
    listener: TcpListener,
) {
    tracing::warn!("DATABASE_URL not set, running on in-memory stores");

    let ledger = InMemoryStockLedger::new();
    let products = seed::label_demo_catalog(&ledger).await;
    let state = Arc::new(AppState::new(
        StockService::with_deadline(ledger, config.request_timeout),
        AuthService::with_deadline(InMemoryCredentialStore::new(), tokens, config.request_timeout),
    ));

    let admin = seed::ensure_admin(&state.auth, &config.admin_email, &config.admin_password)
        .await
        .expect("failed to create admin account");
    state.stock.ledger().label_user(admin, "Administrator").await;
    seed::open_stocks(&state.stock, &products, 100)
        .await
        .expect("failed to open demo stock");
    tracing::info!(email = %config.admin_email, products = products.len(), "demo data ready");

    serve(listener, api::create_app(state, metrics_handle)).await;
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if config.uses_default_secret() {
        tracing::warn!("JWT_SECRET not set, using the built-in development secret");
    }
    let tokens = TokenIssuer::new(&config.jwt_secret);

    // 3. Bind, then serve on the configured stores
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    tracing::info!(%addr, prefix = api::API_PREFIX, "starting API server");

    match config.database_url.clone() {
        Some(url) => run_postgres(&config, &url, tokens, metrics_handle, listener).await,
        None => run_in_memory(&config, tokens, metrics_handle, listener).await,
    }

    tracing::info!("server shut down gracefully");
}
