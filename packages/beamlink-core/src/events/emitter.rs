//! Event emitter abstraction for decoupling the orchestrator from transport.

use super::{DiscoveryNotice, PlaybackNotice, SessionNotice};

/// Trait for emitting domain events without knowledge of transport.
///
/// The orchestrator emits through this trait; how events reach clients
/// (WebSocket broadcast, logs, nothing at all) is up to the implementation.
pub trait EventEmitter: Send + Sync {
    /// Emits a discovery window event.
    fn emit_discovery(&self, event: DiscoveryNotice);

    /// Emits a session state transition.
    fn emit_session(&self, event: SessionNotice);

    /// Emits a playback event.
    fn emit_playback(&self, event: PlaybackNotice);
}

/// No-op emitter for embedding without an event consumer.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_discovery(&self, _event: DiscoveryNotice) {}

    fn emit_session(&self, _event: SessionNotice) {}

    fn emit_playback(&self, _event: PlaybackNotice) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_discovery(&self, event: DiscoveryNotice) {
        tracing::debug!(?event, "discovery_event");
    }

    fn emit_session(&self, event: SessionNotice) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_playback(&self, event: PlaybackNotice) {
        tracing::debug!(?event, "playback_event");
    }
}
