//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the platform collaborators come in,
//! the orchestrator, dispatcher and event bridge come out.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::backend::{DiscoveryBackend, SessionBackend};
use crate::config::CastConfig;
use crate::error::{CastError, CastResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::protocol_constants::EVENT_CHANNEL_CAPACITY;
use crate::runtime::TokioSpawner;
use crate::services::{CastDispatcher, Orchestrator};

/// How long [`BootstrappedServices::shutdown`] waits for the orchestrator.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Entry point for named commands.
    pub dispatcher: CastDispatcher,
    /// Event bridge for emitting events to WebSocket and optional external consumers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Validated configuration the orchestrator runs with.
    pub config: CastConfig,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Initiates graceful shutdown.
    ///
    /// Pending commands are answered with an internal error, an open
    /// discovery window is stopped and any live session is ended.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.dispatcher.stopped())
            .await
            .is_err()
        {
            log::warn!(
                "[Bootstrap] Orchestrator did not stop within {:?}",
                SHUTDOWN_TIMEOUT
            );
            return;
        }

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps the casting services on the current Tokio runtime.
///
/// # Arguments
/// * `config` - Orchestrator configuration (validated here)
/// * `discovery` - Platform discovery collaborator
/// * `sessions` - Platform session collaborator
///
/// # Errors
///
/// Returns [`CastError::Internal`] if the configuration is invalid.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn bootstrap_services(
    config: &CastConfig,
    discovery: Arc<dyn DiscoveryBackend>,
    sessions: Arc<dyn SessionBackend>,
) -> CastResult<BootstrappedServices> {
    config
        .validate()
        .map_err(|e| CastError::Internal(format!("Invalid cast configuration: {}", e)))?;

    let spawner = TokioSpawner::current();
    let event_bridge = Arc::new(BroadcastEventBridge::new(EVENT_CHANNEL_CAPACITY));
    let cancel_token = CancellationToken::new();

    let dispatcher = Orchestrator::spawn(
        config.clone(),
        discovery,
        sessions,
        Arc::clone(&event_bridge) as Arc<dyn EventEmitter>,
        spawner.clone(),
        cancel_token.clone(),
    );

    log::info!(
        "[Bootstrap] Services ready (discovery window {}ms, capability check {:?})",
        config.discovery_window_ms,
        config.capability_check
    );

    Ok(BootstrappedServices {
        dispatcher,
        event_bridge,
        config: config.clone(),
        spawner,
        cancel_token,
    })
}
