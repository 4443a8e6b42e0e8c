//! Session state machine.
//!
//! Pure bookkeeping: no collaborator calls, no timers. The orchestrator
//! feeds it commands and tagged collaborator events and acts on what it
//! returns.
//!
//! ```text
//!           begin_connect             on_started
//!   Idle ──────────────────► Connecting ──────────► Connected ◄──┐
//!    ▲                          │                      │  ▲       │ on_resumed
//!    │      abort_connect       │        on_suspended  │  │       │
//!    ├──────────────────────────┘                      ▼  │       │
//!    │                                             Suspended ─────┘
//!    │          on_ended / force_idle                  │
//!    ├─────────────────────────── Ending ◄─────────────┘ begin_disconnect
//!    └──────────────────────────────────────────────────────────────────
//! ```
//!
//! Every connect attempt bumps the session epoch; callbacks tagged with an
//! older epoch are ignored.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::backend::{Device, RemoteMediaClient};
use crate::error::{CastError, CastResult};

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Suspended,
    Ending,
}

impl SessionState {
    /// States in which the outcome of an earlier request is still pending.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Connecting | Self::Ending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Suspended => "suspended",
            Self::Ending => "ending",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last transport state acknowledged by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Whether media is loaded on the receiver.
    pub fn has_media(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

/// A live (or suspended, or ending) session.
#[derive(Clone)]
pub struct Session {
    id: String,
    device: Device,
    client: Option<Arc<dyn RemoteMediaClient>>,
    playback: PlaybackState,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn client(&self) -> Option<&Arc<dyn RemoteMediaClient>> {
        self.client.as_ref()
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("device", &self.device.id)
            .field("has_client", &self.client.is_some())
            .field("playback", &self.playback)
            .finish()
    }
}

/// Point-in-time view of the session for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    pub playback: PlaybackState,
}

enum Phase {
    Idle,
    Connecting(Device),
    Connected(Session),
    Suspended(Session),
    Ending(Session),
}

/// Result of [`SessionMachine::begin_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPlan {
    /// Ask the collaborator to connect; tag its callbacks with `epoch`.
    Connect { epoch: u64 },
    /// Already connected to this device; nothing to do.
    AlreadyConnected,
}

/// Result of [`SessionMachine::begin_disconnect`].
pub enum DisconnectPlan {
    AlreadyIdle,
    /// Stop media on `stop_media` (if any), then end `session_id`.
    End {
        session_id: String,
        stop_media: Option<Arc<dyn RemoteMediaClient>>,
    },
}

/// Single source of truth for the session lifecycle.
pub struct SessionMachine {
    phase: Phase,
    epoch: u64,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Connecting(_) => SessionState::Connecting,
            Phase::Connected(_) => SessionState::Connected,
            Phase::Suspended(_) => SessionState::Suspended,
            Phase::Ending(_) => SessionState::Ending,
        }
    }

    /// Epoch of the most recent connect attempt.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Connected(s) | Phase::Suspended(s) | Phase::Ending(s) => Some(s),
            Phase::Idle | Phase::Connecting(_) => None,
        }
    }

    /// Device of the current attempt or session.
    pub fn device(&self) -> Option<&Device> {
        match &self.phase {
            Phase::Connecting(device) => Some(device),
            _ => self.session().map(Session::device),
        }
    }

    /// Media client of a `Connected` session.
    pub fn client(&self) -> Option<Arc<dyn RemoteMediaClient>> {
        match &self.phase {
            Phase::Connected(s) => s.client.clone(),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            state: self.state(),
            session_id: session.map(|s| s.id.clone()),
            device: self.device().cloned(),
            playback: session.map(|s| s.playback).unwrap_or_default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a connect attempt to `device`.
    ///
    /// # Errors
    ///
    /// [`CastError::SessionBusy`] while connecting, suspended or ending, or
    /// when a session with another device exists.
    pub fn begin_connect(&mut self, device: Device) -> CastResult<ConnectPlan> {
        let refusal = match &self.phase {
            Phase::Idle => None,
            Phase::Connecting(_) | Phase::Ending(_) => Some(Err(CastError::SessionBusy(
                format!("session is {}", self.state()),
            ))),
            Phase::Connected(s) if s.device.id == device.id => {
                Some(Ok(ConnectPlan::AlreadyConnected))
            }
            Phase::Suspended(s) if s.device.id == device.id => {
                Some(Err(CastError::SessionBusy("session is suspended".to_string())))
            }
            Phase::Connected(s) | Phase::Suspended(s) => Some(Err(CastError::SessionBusy(
                format!("already connected to {}; disconnect first", s.device.name),
            ))),
        };
        if let Some(outcome) = refusal {
            return outcome;
        }

        self.epoch += 1;
        self.phase = Phase::Connecting(device);
        Ok(ConnectPlan::Connect { epoch: self.epoch })
    }

    /// Starts ending the current session.
    ///
    /// # Errors
    ///
    /// [`CastError::SessionBusy`] while connecting or already ending.
    pub fn begin_disconnect(&mut self) -> CastResult<DisconnectPlan> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => Ok(DisconnectPlan::AlreadyIdle),
            phase @ (Phase::Connecting(_) | Phase::Ending(_)) => {
                self.phase = phase;
                Err(CastError::SessionBusy(format!(
                    "session is {}",
                    self.state()
                )))
            }
            Phase::Connected(session) | Phase::Suspended(session) => {
                let stop_media = session
                    .client
                    .clone()
                    .filter(|_| session.playback.has_media());
                let plan = DisconnectPlan::End {
                    session_id: session.id.clone(),
                    stop_media,
                };
                self.phase = Phase::Ending(session);
                Ok(plan)
            }
        }
    }

    /// Returns to `Idle` from any state. Returns the dropped session, if any.
    pub fn force_idle(&mut self) -> Option<Session> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connected(s) | Phase::Suspended(s) | Phase::Ending(s) => Some(s),
            Phase::Idle | Phase::Connecting(_) => None,
        }
    }

    /// Abandons the connect attempt `epoch`. Returns its device if it was pending.
    pub fn abort_connect(&mut self, epoch: u64) -> Option<Device> {
        if epoch != self.epoch || !matches!(self.phase, Phase::Connecting(_)) {
            return None;
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connecting(device) => Some(device),
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collaborator Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Binds a started session. Returns `true` if the state changed.
    ///
    /// A duplicate `Started` for an already connected session rebinds its id
    /// and client.
    pub fn on_started(
        &mut self,
        epoch: u64,
        session_id: String,
        client: Option<Arc<dyn RemoteMediaClient>>,
    ) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connecting(device) => {
                self.phase = Phase::Connected(Session {
                    id: session_id,
                    device,
                    client,
                    playback: PlaybackState::Idle,
                });
                true
            }
            Phase::Connected(mut s) | Phase::Suspended(mut s) => {
                s.id = session_id;
                s.client = client;
                self.phase = Phase::Connected(s);
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Rebinds a resumed session. Returns `true` if the state changed.
    pub fn on_resumed(
        &mut self,
        epoch: u64,
        session_id: String,
        client: Option<Arc<dyn RemoteMediaClient>>,
    ) -> bool {
        self.on_started(epoch, session_id, client)
    }

    /// Suspends a connected session, dropping its client.
    pub fn on_suspended(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Connected(mut s) => {
                s.client = None;
                self.phase = Phase::Suspended(s);
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Handles the session-ended callback. Returns the state it ended from.
    pub fn on_ended(&mut self, epoch: u64) -> Option<SessionState> {
        if epoch != self.epoch {
            return None;
        }
        let previous = self.state();
        if previous == SessionState::Idle {
            return None;
        }
        self.phase = Phase::Idle;
        Some(previous)
    }

    /// Attaches a media client found by polling. Only valid while `Connected`.
    pub fn bind_client(&mut self, client: Arc<dyn RemoteMediaClient>) -> bool {
        match &mut self.phase {
            Phase::Connected(s) => {
                s.client = Some(client);
                true
            }
            _ => false,
        }
    }

    pub fn set_playback(&mut self, playback: PlaybackState) {
        if let Phase::Connected(s) = &mut self.phase {
            s.playback = playback;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedMediaClient;

    fn client() -> Arc<dyn RemoteMediaClient> {
        Arc::new(SimulatedMediaClient::default())
    }

    fn connected(machine: &mut SessionMachine, id: &str) -> u64 {
        let ConnectPlan::Connect { epoch } = machine.begin_connect(Device::new(id, id)).unwrap()
        else {
            panic!("expected a fresh connect");
        };
        assert!(machine.on_started(epoch, format!("session-{}", id), Some(client())));
        epoch
    }

    #[test]
    fn connect_then_start_binds_session() {
        let mut machine = SessionMachine::new();
        let plan = machine.begin_connect(Device::new("A", "Den")).unwrap();
        assert_eq!(plan, ConnectPlan::Connect { epoch: 1 });
        assert_eq!(machine.state(), SessionState::Connecting);

        assert!(machine.on_started(1, "s-1".into(), None));
        assert_eq!(machine.state(), SessionState::Connected);
        assert_eq!(machine.session().map(Session::id), Some("s-1"));
        assert!(machine.client().is_none());
    }

    #[test]
    fn second_connect_while_connecting_is_busy() {
        let mut machine = SessionMachine::new();
        machine.begin_connect(Device::new("A", "Den")).unwrap();
        let err = machine.begin_connect(Device::new("B", "Hall")).unwrap_err();
        assert_eq!(err.code(), "session_busy");
        assert_eq!(machine.epoch(), 1);
    }

    #[test]
    fn reconnect_to_same_device_is_a_noop() {
        let mut machine = SessionMachine::new();
        connected(&mut machine, "A");
        assert_eq!(
            machine.begin_connect(Device::new("A", "A")).unwrap(),
            ConnectPlan::AlreadyConnected
        );
        assert!(machine.begin_connect(Device::new("B", "B")).is_err());
    }

    #[test]
    fn connect_while_suspended_waits_for_resume() {
        let mut machine = SessionMachine::new();
        let epoch = connected(&mut machine, "A");
        assert!(machine.on_suspended(epoch));

        let err = machine.begin_connect(Device::new("A", "A")).unwrap_err();
        assert_eq!(err, CastError::SessionBusy("session is suspended".into()));
        assert_eq!(machine.state(), SessionState::Suspended);
        assert_eq!(machine.epoch(), epoch);

        assert!(machine.on_resumed(epoch, "session-A".into(), Some(client())));
        assert_eq!(
            machine.begin_connect(Device::new("A", "A")).unwrap(),
            ConnectPlan::AlreadyConnected
        );
    }

    #[test]
    fn resumed_while_connecting_binds_session() {
        let mut machine = SessionMachine::new();
        machine.begin_connect(Device::new("A", "Den")).unwrap();

        assert!(machine.on_resumed(1, "s-resumed".into(), Some(client())));
        assert_eq!(machine.state(), SessionState::Connected);
        assert_eq!(machine.session().map(Session::id), Some("s-resumed"));
        assert!(machine.client().is_some());
    }

    #[test]
    fn stale_epoch_events_are_ignored() {
        let mut machine = SessionMachine::new();
        let epoch = machine
            .begin_connect(Device::new("A", "Den"))
            .map(|plan| match plan {
                ConnectPlan::Connect { epoch } => epoch,
                ConnectPlan::AlreadyConnected => 0,
            })
            .unwrap();
        assert!(machine.abort_connect(epoch).is_some());

        connected(&mut machine, "B");
        assert!(!machine.on_suspended(epoch));
        assert_eq!(machine.on_ended(epoch), None);
        assert_eq!(machine.state(), SessionState::Connected);
    }

    #[test]
    fn suspend_drops_client_and_resume_restores_it() {
        let mut machine = SessionMachine::new();
        let epoch = connected(&mut machine, "A");

        assert!(machine.on_suspended(epoch));
        assert_eq!(machine.state(), SessionState::Suspended);
        assert!(machine.client().is_none());

        assert!(machine.on_resumed(epoch, "session-A".into(), Some(client())));
        assert_eq!(machine.state(), SessionState::Connected);
        assert!(machine.client().is_some());
    }

    #[test]
    fn disconnect_from_idle_needs_no_session() {
        let mut machine = SessionMachine::new();
        assert!(matches!(
            machine.begin_disconnect().unwrap(),
            DisconnectPlan::AlreadyIdle
        ));
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[test]
    fn disconnect_stops_media_only_when_loaded() {
        let mut machine = SessionMachine::new();
        let epoch = connected(&mut machine, "A");

        match machine.begin_disconnect().unwrap() {
            DisconnectPlan::End {
                session_id,
                stop_media,
            } => {
                assert_eq!(session_id, "session-A");
                assert!(stop_media.is_none());
            }
            DisconnectPlan::AlreadyIdle => panic!("expected End"),
        }
        assert_eq!(machine.state(), SessionState::Ending);
        assert!(machine.begin_disconnect().is_err());

        assert_eq!(machine.on_ended(epoch), Some(SessionState::Ending));
        assert_eq!(machine.state(), SessionState::Idle);

        let _ = connected(&mut machine, "A");
        machine.set_playback(PlaybackState::Playing);
        match machine.begin_disconnect().unwrap() {
            DisconnectPlan::End { stop_media, .. } => assert!(stop_media.is_some()),
            DisconnectPlan::AlreadyIdle => panic!("expected End"),
        }
    }

    #[test]
    fn ended_during_connecting_reports_previous_state() {
        let mut machine = SessionMachine::new();
        machine.begin_connect(Device::new("A", "Den")).unwrap();
        assert_eq!(machine.on_ended(1), Some(SessionState::Connecting));
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[test]
    fn snapshot_reflects_session() {
        let mut machine = SessionMachine::new();
        connected(&mut machine, "A");
        machine.set_playback(PlaybackState::Paused);

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.state, SessionState::Connected);
        assert_eq!(snapshot.session_id.as_deref(), Some("session-A"));
        assert_eq!(snapshot.device.map(|d| d.id), Some("A".to_string()));
        assert_eq!(snapshot.playback, PlaybackState::Paused);
    }
}
