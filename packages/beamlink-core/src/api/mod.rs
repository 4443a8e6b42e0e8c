//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the dispatcher.
//! It provides the router construction and server startup functionality.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrappedServices;
use crate::events::BroadcastEventBridge;
use crate::services::CastDispatcher;

pub mod http;
pub mod response;
pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the TCP listener.
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Entry point for named commands.
    pub dispatcher: CastDispatcher,
    /// Source of broadcast events for WebSocket clients.
    pub event_bridge: Arc<BroadcastEventBridge>,
}

impl AppState {
    pub fn from_services(services: &BootstrappedServices) -> Self {
        Self {
            dispatcher: services.dispatcher.clone(),
            event_bridge: Arc::clone(&services.event_bridge),
        }
    }
}

/// Serves the API on `addr` until `shutdown` is cancelled.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    log::info!("Server listening on http://{}", listener.local_addr()?);
    let app = http::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
