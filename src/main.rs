//! salespilot-gateway server entry point.
//!
//! Starts the Axum HTTP server with the webhook and operational endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salespilot_gateway::api;
use salespilot_gateway::app_state::AppState;
use salespilot_gateway::config::{GatewayConfig, PersistenceBackend};
use salespilot_gateway::persistence::{InMemoryStore, PostgresStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.persistence_backend,
        "starting salespilot-gateway"
    );
    if config.razorpay_webhook_secret.is_none() {
        tracing::warn!("RAZORPAY_WEBHOOK_SECRET is not set; Razorpay webhooks will be rejected");
    }
    if config.meta_app_secret.is_none() {
        tracing::warn!("META_APP_SECRET is not set; WhatsApp and Instagram webhooks will be rejected");
    }

    // Build persistence layer
    let store: Arc<dyn Store> = match config.persistence_backend {
        PersistenceBackend::Memory => match config.seed_file.as_deref() {
            Some(path) => Arc::new(InMemoryStore::load_json(path).await?),
            None => Arc::new(InMemoryStore::new()),
        },
        PersistenceBackend::Postgres => {
            let store = PostgresStore::connect(&config).await?;
            store.migrate().await?;
            Arc::new(store)
        }
    };

    let listen_addr = config.listen_addr;
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    // Build application state
    let app_state = AppState::new(config, store)?;

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
