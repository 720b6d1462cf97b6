mod api;
mod config;
mod engine;
mod error;
mod models;
mod observability;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::engine::gateway::HttpConfirmationGateway;
use crate::engine::ledger::InMemoryAssignmentLedger;
use crate::engine::pool::InMemoryDriverPool;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let gateway = HttpConfirmationGateway::new(
        &config.ride_request_service_url,
        Duration::from_secs(config.confirm_timeout_secs),
    )
    .map_err(|err| error::AppError::Internal(format!("failed to build gateway: {err}")))?;

    let (app_state, ride_rx) = state::AppState::new(
        Arc::new(InMemoryDriverPool::new()),
        Arc::new(InMemoryAssignmentLedger::new()),
        Arc::new(gateway),
        config.ride_queue_size,
    );
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(engine::dispatch::run_dispatch_engine(
        shared_state.clone(),
        ride_rx,
        shutdown_rx,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    let _ = shutdown_tx.send(true);
}
