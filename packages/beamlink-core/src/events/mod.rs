//! Event system for real-time client notification.
//!
//! This module provides:
//! - [`EventEmitter`] trait the orchestrator emits through
//! - [`BroadcastEventBridge`] for WebSocket transport
//! - Notice types for discovery windows, session lifecycle and playback

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::backend::Device;
use crate::session::SessionState;

/// Events broadcast to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Discovery window progress.
    Discovery(DiscoveryNotice),

    /// Session state transitions.
    Session(SessionNotice),

    /// Media loads and transport commands acknowledged by the receiver.
    Playback(PlaybackNotice),
}

/// Discovery window progress.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiscoveryNotice {
    /// A discovery window opened.
    WindowOpened {
        #[serde(rename = "windowId")]
        window_id: u64,
        #[serde(rename = "durationMs")]
        duration_ms: u64,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A new device id was seen in the open window.
    DeviceFound {
        #[serde(rename = "windowId")]
        window_id: u64,
        device: Device,
        timestamp: u64,
    },
    /// A device disappeared from the open window.
    DeviceLost {
        #[serde(rename = "windowId")]
        window_id: u64,
        #[serde(rename = "deviceId")]
        device_id: String,
        timestamp: u64,
    },
    /// The window closed with this snapshot.
    WindowClosed {
        #[serde(rename = "windowId")]
        window_id: u64,
        devices: Vec<Device>,
        timestamp: u64,
    },
}

/// Session state transitions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionNotice {
    StateChanged {
        state: SessionState,
        #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        /// Why the transition happened, when it was not caller-initiated.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        timestamp: u64,
    },
}

/// Playback notices.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackNotice {
    /// The receiver accepted a media load.
    MediaLoaded {
        #[serde(rename = "sessionId")]
        session_id: String,
        url: String,
        title: String,
        #[serde(rename = "contentType")]
        content_type: String,
        timestamp: u64,
    },
    /// The receiver accepted a transport command.
    ControlApplied {
        #[serde(rename = "sessionId")]
        session_id: String,
        action: String,
        #[serde(rename = "positionMs", skip_serializing_if = "Option::is_none")]
        position_ms: Option<u64>,
        timestamp: u64,
    },
    /// The receiver rejected a load or transport command.
    CommandFailed {
        #[serde(rename = "sessionId")]
        session_id: String,
        action: String,
        error: String,
        timestamp: u64,
    },
}

impl From<DiscoveryNotice> for BroadcastEvent {
    fn from(event: DiscoveryNotice) -> Self {
        BroadcastEvent::Discovery(event)
    }
}

impl From<SessionNotice> for BroadcastEvent {
    fn from(event: SessionNotice) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<PlaybackNotice> for BroadcastEvent {
    fn from(event: PlaybackNotice) -> Self {
        BroadcastEvent::Playback(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_notice_serializes_with_category_and_type() {
        let event: BroadcastEvent = SessionNotice::StateChanged {
            state: SessionState::Connected,
            session_id: Some("s-1".into()),
            device_id: Some("abc".into()),
            reason: None,
            timestamp: 7,
        }
        .into();

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "category": "session",
                "type": "stateChanged",
                "state": "connected",
                "sessionId": "s-1",
                "deviceId": "abc",
                "timestamp": 7
            })
        );
    }

    #[test]
    fn window_closed_carries_devices() {
        let event: BroadcastEvent = DiscoveryNotice::WindowClosed {
            window_id: 3,
            devices: vec![Device::new("a", "Den")],
            timestamp: 1,
        }
        .into();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["category"], "discovery");
        assert_eq!(value["type"], "windowClosed");
        assert_eq!(value["windowId"], 3);
        assert_eq!(value["devices"][0]["type"], "chromecast");
    }
}
