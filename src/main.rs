use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use walrus_bridge::api;
use walrus_bridge::config::Config;
use walrus_bridge::handlers::HandlerSlot;
use walrus_bridge::ledger::Ledger;
use walrus_bridge::monitor::JsonRpcMonitor;
use walrus_bridge::publisher::WalrusPublisher;
use walrus_bridge::worker::BridgeWorker;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // Initialize logging
    init_logging();

    tracing::info!("Starting Walrus bridge operator");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        markets = config.markets.len(),
        publishers = config.publisher.endpoints.len(),
        "Configuration loaded"
    );

    // Seed the ledger with static market configuration
    let ledger = Arc::new(Ledger::new());
    for market in &config.markets {
        ledger.seed_market(market.vault_info(), config.collateral_params(market));
        tracing::info!(
            chain_id = %market.chain_id,
            asset = %market.asset,
            vault = %market.vault_address,
            "Market registered"
        );
    }

    // External collaborators
    let publisher = Arc::new(WalrusPublisher::new(
        config.publisher.endpoints.clone(),
        Duration::from_secs(config.publisher.timeout_secs),
        config.publisher.store_epochs,
    )?);
    let monitor = Arc::new(JsonRpcMonitor::new(
        config.monitor.eth_rpc_url.clone(),
        Duration::from_secs(config.monitor.timeout_secs),
    )?);

    // Mint and payout handlers custody keys and are wired by the deployment;
    // disabled slots skip the post-commit handoffs.
    let worker = Arc::new(BridgeWorker::new(
        Arc::clone(&ledger),
        publisher,
        monitor,
        HandlerSlot::Disabled,
        HandlerSlot::Disabled,
        config.worker_options(),
    ));
    let worker_handle = worker.start();
    tracing::info!("Bridge worker started");

    // Start the health/metrics API server
    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let state = api::AppState {
        ledger: Arc::clone(&ledger),
        started: Instant::now(),
    };
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_addr, state).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    wait_for_shutdown_signal().await;

    worker_handle.stop().await;
    tracing::info!("Walrus bridge operator stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walrus_bridge=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
