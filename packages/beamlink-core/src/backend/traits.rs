//! Collaborator traits for platform casting services.
//!
//! The orchestrator only talks to the platform through these traits, which
//! keeps it testable without real receivers on the network:
//!
//! - [`DiscoveryBackend`]: finds receivers and reports them through a [`DiscoverySink`]
//! - [`SessionBackend`]: opens and ends sessions, reporting lifecycle through a [`SessionSink`]
//! - [`RemoteMediaClient`]: loads media and drives transport on a live session
//!
//! [`CastBackend`] combines the first two for platforms that provide both
//! from a single object.

use std::sync::Arc;

use async_trait::async_trait;

use super::sink::{DiscoverySink, SessionSink};
use super::types::{BackendResult, Device};
use crate::media::MediaDescriptor;

/// Receiver discovery.
pub trait DiscoveryBackend: Send + Sync {
    /// Starts reporting devices into `sink` until [`stop_discovery`](Self::stop_discovery).
    ///
    /// Events may be reported from any thread, including synchronously from
    /// inside this call.
    fn start_discovery(&self, sink: DiscoverySink) -> BackendResult<()>;

    /// Stops reporting. Must be safe to call when discovery is not running.
    fn stop_discovery(&self);
}

/// Session establishment and teardown.
pub trait SessionBackend: Send + Sync {
    /// Whether the platform casting runtime is present.
    fn is_available(&self) -> bool;

    /// Asks the platform to open a session with `device`.
    ///
    /// An `Ok` return only means the request was accepted; the outcome is
    /// reported later through `sink` as `Started` or `StartFailed`.
    fn connect(&self, device: &Device, sink: SessionSink) -> BackendResult<()>;

    /// Asks the platform to end the session. Completion is reported as `Ended`.
    fn end_session(&self, session_id: &str) -> BackendResult<()>;

    /// Returns the media client for `session_id` if it is available yet.
    fn remote_media_client(&self, session_id: &str) -> Option<Arc<dyn RemoteMediaClient>>;
}

/// Media and transport control on a live session.
#[async_trait]
pub trait RemoteMediaClient: Send + Sync {
    async fn load(&self, descriptor: &MediaDescriptor) -> BackendResult<()>;

    async fn play(&self) -> BackendResult<()>;

    async fn pause(&self) -> BackendResult<()>;

    /// Seeks to an absolute position in milliseconds.
    async fn seek(&self, position_ms: u64) -> BackendResult<()>;

    async fn stop(&self) -> BackendResult<()>;
}

/// Both collaborator roles from one platform object.
pub trait CastBackend: DiscoveryBackend + SessionBackend {}

impl<T: DiscoveryBackend + SessionBackend> CastBackend for T {}
