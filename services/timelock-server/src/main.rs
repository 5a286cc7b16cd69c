//! Timelock Server
//!
//! HTTP front end for time-locked XRP escrows. Buyer and seller credentials
//! are held server side; clients only name amounts and escrow sequences.
//!
//! # Usage
//!
//! ```bash
//! # Against the test network
//! BUYER_ADDRESS=r... BUYER_SEED=s... SELLER_ADDRESS=r... SELLER_SEED=s... timelock-server
//!
//! # Against the in-process ledger, with demo accounts
//! timelock-server --network local-sim
//!
//! # Environment overrides
//! TIMELOCK__SERVER__PORT=8080 timelock-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use timelock_api::{create_router, ApiConfig, AppState};
use timelock_gateway::{LocalSimLedger, TransactionGateway};
use timelock_service::{EscrowConfig, EscrowLifecycleService};
use timelock_types::{Drops, NetworkEndpoint, LOCAL_SIM_URL};

use crate::config::{LedgerSettings, ServerConfig};

/// Demo accounts funded on the in-process ledger when none are configured
const SIM_BUYER_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
const SIM_BUYER_SEED: &str = "sSimulatedBuyerSeed";
const SIM_SELLER_ADDRESS: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";
const SIM_SELLER_SEED: &str = "sSimulatedSellerSeed";

/// 10,000 XRP per simulated account
const SIM_STARTING_BALANCE: Drops = Drops::new(10_000_000_000);

// =============================================================================
// CLI Arguments
// =============================================================================

/// Timelock Server - Time-locked XRP escrows over HTTP
#[derive(Parser, Debug)]
#[command(name = "timelock-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "TIMELOCK_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Ledger WebSocket URL, or `local-sim`
    #[arg(long, env = "XRPL_NETWORK")]
    network: Option<String>,

    #[arg(long, env = "BUYER_ADDRESS")]
    buyer_address: Option<String>,

    #[arg(long, env = "BUYER_SEED", hide_env_values = true)]
    buyer_seed: Option<String>,

    #[arg(long, env = "SELLER_ADDRESS")]
    seller_address: Option<String>,

    #[arg(long, env = "SELLER_SEED", hide_env_values = true)]
    seller_seed: Option<String>,

    /// Seconds after creation before an escrow may be finished
    #[arg(long, env = "GRACE_PERIOD_SECS")]
    grace_period: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TIMELOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (json, pretty)
    #[arg(long, env = "TIMELOCK_LOG_FORMAT")]
    log_format: Option<String>,

    /// Expose Prometheus metrics on this port
    #[arg(long, env = "TIMELOCK_METRICS_PORT")]
    metrics_port: Option<u16>,
}

impl Args {
    /// Apply flags on top of file and environment configuration
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let ledger = &mut config.ledger;
        if let Some(network) = self.network {
            ledger.network_url = network;
        }
        if let Some(address) = self.buyer_address {
            ledger.buyer_address = address;
        }
        if let Some(seed) = self.buyer_seed {
            ledger.buyer_seed = seed;
        }
        if let Some(address) = self.seller_address {
            ledger.seller_address = address;
        }
        if let Some(seed) = self.seller_seed {
            ledger.seller_seed = seed;
        }
        if let Some(secs) = self.grace_period {
            ledger.grace_period_secs = secs;
        }

        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(port) = self.metrics_port {
            config.metrics.enabled = true;
            config.metrics.port = Some(port);
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;
    args.apply(&mut server_config);

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Timelock Server"
    );

    let service = Arc::new(build_service(&server_config.ledger)?);
    tracing::info!(
        network = %service.config().network.url,
        buyer = %service.config().buyer.address,
        seller = %service.config().seller.address,
        grace_period_secs = service.config().grace_period_secs,
        "Escrow service configured"
    );

    let state = Arc::new(AppState::new(service.clone()));
    let app = create_router(state, ApiConfig::from(&server_config.api));

    if server_config.metrics.enabled {
        start_metrics_server(&server_config.metrics)?;
    }

    let addr = server_config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match tokio::time::timeout(server_config.server.shutdown_timeout(), service.shutdown()).await {
        Ok(Ok(())) => tracing::info!("Ledger connection closed"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to close ledger connection"),
        Err(_) => tracing::warn!("Timed out closing ledger connection"),
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

/// Initialize tracing/logging
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
    }

    Ok(())
}

/// Build the escrow service for the configured ledger.
///
/// Missing or invalid credentials are fatal, except against the in-process
/// ledger, which falls back to funded demo accounts.
fn build_service(settings: &LedgerSettings) -> anyhow::Result<EscrowLifecycleService> {
    let endpoint = NetworkEndpoint::new(&settings.network_url);

    let (config, gateway) = if endpoint.is_local_sim() {
        let settings = with_sim_accounts(settings);
        let config = escrow_config(&settings)?;

        let ledger = LocalSimLedger::new();
        ledger.fund(&config.buyer.address, settings.buyer_seed.clone(), SIM_STARTING_BALANCE);
        ledger.fund(&config.seller.address, settings.seller_seed.clone(), SIM_STARTING_BALANCE);
        tracing::warn!("Using the in-process ledger; nothing is submitted to a real network");

        (config, TransactionGateway::local_sim(ledger, settings.gateway_config()))
    } else {
        let config = escrow_config(settings)?;
        let gateway = TransactionGateway::websocket(endpoint, settings.gateway_config());
        (config, gateway)
    };

    Ok(EscrowLifecycleService::new(Arc::new(gateway), config))
}

fn escrow_config(settings: &LedgerSettings) -> anyhow::Result<EscrowConfig> {
    let config = EscrowConfig::from_settings(
        &settings.network_url,
        &settings.buyer_address,
        &settings.buyer_seed,
        &settings.seller_address,
        &settings.seller_seed,
    )?
    .with_grace_period(settings.grace_period_secs);
    config.validate()?;
    Ok(config)
}

/// Fill in demo accounts for any party left unconfigured
fn with_sim_accounts(settings: &LedgerSettings) -> LedgerSettings {
    let mut settings = settings.clone();
    settings.network_url = LOCAL_SIM_URL.to_string();
    if settings.buyer_address.is_empty() || settings.buyer_seed.is_empty() {
        settings.buyer_address = SIM_BUYER_ADDRESS.to_string();
        settings.buyer_seed = SIM_BUYER_SEED.to_string();
    }
    if settings.seller_address.is_empty() || settings.seller_seed.is_empty() {
        settings.seller_address = SIM_SELLER_ADDRESS.to_string();
        settings.seller_seed = SIM_SELLER_SEED.to_string();
    }
    settings
}

/// Start Prometheus metrics server
fn start_metrics_server(config: &config::MetricsConfig) -> anyhow::Result<()> {
    if let Some(port) = config.port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;

        metrics::describe_counter!(
            timelock_service::SUBMISSIONS_TOTAL,
            "Escrow operations by action and outcome"
        );

        tracing::info!(port = port, "Metrics server started");
    }

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
