//! Types exchanged with the platform collaborators.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::traits::RemoteMediaClient;

/// Kind of receiver. There is only one abstract kind today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceKind {
    #[default]
    #[serde(rename = "chromecast")]
    CastReceiver,
}

/// A cast receiver seen during discovery.
///
/// Serializes as `{ id, name, type, isConnected }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: DeviceKind,
    #[serde(rename = "isConnected", default)]
    pub connected: bool,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: DeviceKind::CastReceiver,
            connected: false,
        }
    }
}

/// Discovery callback from the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added(Device),
    Removed(String),
}

/// Session lifecycle callback from the session collaborator.
pub enum SessionEvent {
    Started {
        session_id: String,
        client: Option<Arc<dyn RemoteMediaClient>>,
    },
    StartFailed {
        reason: String,
    },
    Resumed {
        session_id: String,
        client: Option<Arc<dyn RemoteMediaClient>>,
    },
    Suspended {
        reason: String,
    },
    Ended {
        error: Option<String>,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::StartFailed { .. } => "start_failed",
            Self::Resumed { .. } => "resumed",
            Self::Suspended { .. } => "suspended",
            Self::Ended { .. } => "ended",
        }
    }
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { session_id, client } | Self::Resumed { session_id, client } => f
                .debug_struct(self.name())
                .field("session_id", session_id)
                .field("has_client", &client.is_some())
                .finish(),
            Self::StartFailed { reason } | Self::Suspended { reason } => f
                .debug_struct(self.name())
                .field("reason", reason)
                .finish(),
            Self::Ended { error } => f.debug_struct(self.name()).field("error", error).finish(),
        }
    }
}

/// Failure reported synchronously by a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The platform runtime is missing or not initialized.
    #[error("platform unavailable: {0}")]
    Unavailable(String),

    /// The receiver or platform refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Failed(String),
}

/// Result alias for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_serializes_to_wire_shape() {
        let mut device = Device::new("abc", "Living Room TV");
        device.connected = true;

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "abc",
                "name": "Living Room TV",
                "type": "chromecast",
                "isConnected": true
            })
        );
    }

    #[test]
    fn session_event_debug_hides_client() {
        let event = SessionEvent::Started {
            session_id: "s-1".into(),
            client: None,
        };
        let text = format!("{:?}", event);
        assert!(text.contains("s-1"));
        assert!(text.contains("has_client: false"));
    }
}
