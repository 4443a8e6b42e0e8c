//! Callback sinks handed to collaborators.
//!
//! Collaborators never touch orchestrator state. They report through a sink,
//! which tags every event with the discovery window or session epoch it
//! belongs to and forwards it to the orchestrator's inbox. Events from a
//! window or session that has since been replaced are dropped there.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::traits::RemoteMediaClient;
use super::types::{Device, DeviceEvent, SessionEvent};
use crate::services::orchestrator::Inbound;

/// Reports discovery callbacks for one discovery window.
#[derive(Clone)]
pub struct DiscoverySink {
    window_id: u64,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl DiscoverySink {
    pub(crate) fn new(window_id: u64, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { window_id, tx }
    }

    /// Window this sink reports into.
    pub fn window_id(&self) -> u64 {
        self.window_id
    }

    /// Forwards an event. Returns `false` once the orchestrator has stopped.
    pub fn send(&self, event: DeviceEvent) -> bool {
        self.tx
            .send(Inbound::Device {
                window_id: self.window_id,
                event,
            })
            .is_ok()
    }

    pub fn device_added(&self, device: Device) -> bool {
        self.send(DeviceEvent::Added(device))
    }

    pub fn device_removed(&self, device_id: impl Into<String>) -> bool {
        self.send(DeviceEvent::Removed(device_id.into()))
    }
}

/// Reports lifecycle callbacks for one connect attempt.
#[derive(Clone)]
pub struct SessionSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<Inbound>,
}

impl SessionSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { epoch, tx }
    }

    /// Session epoch this sink reports into.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Forwards an event. Returns `false` once the orchestrator has stopped.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx
            .send(Inbound::Session {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }

    pub fn started(
        &self,
        session_id: impl Into<String>,
        client: Option<Arc<dyn RemoteMediaClient>>,
    ) -> bool {
        self.send(SessionEvent::Started {
            session_id: session_id.into(),
            client,
        })
    }

    pub fn start_failed(&self, reason: impl Into<String>) -> bool {
        self.send(SessionEvent::StartFailed {
            reason: reason.into(),
        })
    }

    pub fn resumed(
        &self,
        session_id: impl Into<String>,
        client: Option<Arc<dyn RemoteMediaClient>>,
    ) -> bool {
        self.send(SessionEvent::Resumed {
            session_id: session_id.into(),
            client,
        })
    }

    pub fn suspended(&self, reason: impl Into<String>) -> bool {
        self.send(SessionEvent::Suspended {
            reason: reason.into(),
        })
    }

    pub fn ended(&self, error: Option<String>) -> bool {
        self.send(SessionEvent::Ended { error })
    }
}
