//! Beamlink Server - standalone headless command server.
//!
//! Wires the Beamlink core to a discovery source and exposes the command
//! surface over HTTP and WebSocket.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use beamlink_core::backend::{DiscoveryBackend, SessionBackend};
use beamlink_core::{
    bootstrap_services, start_server, AppState, MdnsDiscovery, SimulatedBackend, TokioSpawner,
};
use clap::Parser;
use tokio::signal;

use crate::config::{DiscoverySource, ServerConfig};

/// Beamlink Server - headless casting session server.
#[derive(Parser, Debug)]
#[command(name = "beamlink-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BEAMLINK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address (overrides config file).
    #[arg(short = 'b', long)]
    bind: Option<std::net::IpAddr>,

    /// Discovery source (overrides config file).
    #[arg(long, value_enum)]
    discovery: Option<DiscoverySource>,

    /// Default discovery window in milliseconds (overrides config file).
    #[arg(long)]
    discovery_window_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Beamlink Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(discovery) = args.discovery {
        config.discovery = discovery;
    }
    if let Some(ms) = args.discovery_window_ms {
        config.cast.discovery_window_ms = ms;
    }

    log::info!(
        "Configuration: bind={}:{}, discovery={:?}",
        config.bind_address,
        config.bind_port,
        config.discovery
    );

    let (discovery, sessions) = build_backends(&config)?;
    let services = bootstrap_services(&config.cast, discovery, sessions)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let app_state = AppState::from_services(&services);
    let addr = SocketAddr::new(config.bind_address, config.bind_port);
    let shutdown = services.cancel_token.child_token();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, addr, shutdown).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Cancels the server's token too
    services.shutdown().await;

    if let Err(e) = server_handle.await {
        log::warn!("Server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Builds the discovery and session collaborators for the configured source.
///
/// Sessions are always simulated; in `mdns` mode the simulated sessions run
/// against receivers found on the network.
fn build_backends(
    config: &ServerConfig,
) -> Result<(Arc<dyn DiscoveryBackend>, Arc<dyn SessionBackend>)> {
    let simulated = config
        .simulated_devices
        .iter()
        .fold(SimulatedBackend::new(), |backend, device| {
            backend.with_device(device.id.clone(), device.name.clone())
        });
    let simulated = Arc::new(simulated);
    let sessions: Arc<dyn SessionBackend> = simulated.clone();

    let discovery: Arc<dyn DiscoveryBackend> = match config.discovery {
        DiscoverySource::Simulated => {
            log::info!(
                "Using simulated discovery with {} receiver(s)",
                config.simulated_devices.len()
            );
            simulated
        }
        DiscoverySource::Mdns => {
            let mdns = MdnsDiscovery::new(TokioSpawner::current())
                .context("Failed to start mDNS discovery")?;
            log::info!("Using mDNS discovery");
            Arc::new(mdns)
        }
    };

    Ok((discovery, sessions))
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
