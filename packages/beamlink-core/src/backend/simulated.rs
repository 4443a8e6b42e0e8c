//! Scripted in-process receivers.
//!
//! [`SimulatedBackend`] implements both collaborator roles against a fixed
//! list of devices. It backs the server's `simulated` discovery mode and the
//! orchestrator tests: connects can start, fail, or wait for a manual
//! trigger, the media client can be withheld for a number of probes, and the
//! hooks let a test suspend, resume or end the session from the "platform"
//! side.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::sink::{DiscoverySink, SessionSink};
use super::traits::{DiscoveryBackend, RemoteMediaClient, SessionBackend};
use super::types::{BackendError, BackendResult, Device};
use crate::media::{MediaCommand, MediaDescriptor};

/// What happens when a connect request is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectBehavior {
    /// Report `Started` immediately.
    #[default]
    Start,
    /// Report `StartFailed` with this reason.
    Fail(String),
    /// Refuse the request synchronously.
    Reject(String),
    /// Stay silent until [`SimulatedBackend::start_session`] is called.
    Manual,
}

/// Number of calls the orchestrator made into the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub start_discovery: u32,
    pub stop_discovery: u32,
    pub connect: u32,
    pub end_session: u32,
    pub client_probes: u32,
}

struct SimState {
    devices: Vec<Device>,
    available: bool,
    connect_behavior: ConnectBehavior,
    /// Probes answered with `None` before the client is handed out.
    client_after_probes: u32,
    auto_end: bool,
    discovery_sink: Option<DiscoverySink>,
    session_sink: Option<SessionSink>,
    session_id: Option<String>,
    probes_this_session: u32,
    calls: CallCounts,
}

/// Scripted discovery and session collaborator.
pub struct SimulatedBackend {
    state: Mutex<SimState>,
    client: Arc<SimulatedMediaClient>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                devices: Vec::new(),
                available: true,
                connect_behavior: ConnectBehavior::Start,
                client_after_probes: 0,
                auto_end: true,
                discovery_sink: None,
                session_sink: None,
                session_id: None,
                probes_this_session: 0,
                calls: CallCounts::default(),
            }),
            client: Arc::new(SimulatedMediaClient::default()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scripting
    // ─────────────────────────────────────────────────────────────────────────

    /// Adds a device announced at the start of every discovery window.
    #[must_use]
    pub fn with_device(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.state.lock().devices.push(Device::new(id, name));
        self
    }

    #[must_use]
    pub fn with_availability(self, available: bool) -> Self {
        self.state.lock().available = available;
        self
    }

    #[must_use]
    pub fn with_connect_behavior(self, behavior: ConnectBehavior) -> Self {
        self.state.lock().connect_behavior = behavior;
        self
    }

    /// Withholds the media client for the first `probes` lookups of a session.
    ///
    /// A non-zero value also means `Started` is reported without a client.
    #[must_use]
    pub fn with_client_after_probes(self, probes: u32) -> Self {
        self.state.lock().client_after_probes = probes;
        self
    }

    /// Whether `end_session` reports `Ended` on its own (default `true`).
    #[must_use]
    pub fn with_auto_end(self, auto_end: bool) -> Self {
        self.state.lock().auto_end = auto_end;
        self
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        self.state.lock().connect_behavior = behavior;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    pub fn media_client(&self) -> Arc<SimulatedMediaClient> {
        Arc::clone(&self.client)
    }

    pub fn session_id(&self) -> Option<String> {
        self.state.lock().session_id.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Platform-side hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Reports a device into the open discovery window.
    pub fn announce_device(&self, id: impl Into<String>, name: impl Into<String>) -> bool {
        let state = self.state.lock();
        state
            .discovery_sink
            .as_ref()
            .is_some_and(|sink| sink.device_added(Device::new(id, name)))
    }

    /// Reports a device as gone from the open discovery window.
    pub fn withdraw_device(&self, id: impl Into<String>) -> bool {
        let state = self.state.lock();
        state
            .discovery_sink
            .as_ref()
            .is_some_and(|sink| sink.device_removed(id))
    }

    /// Completes a [`ConnectBehavior::Manual`] connect.
    pub fn start_session(&self) -> bool {
        let mut state = self.state.lock();
        let session_id = new_session_id();
        state.session_id = Some(session_id.clone());
        state.probes_this_session = 0;
        let client = self.initial_client(&state);
        state
            .session_sink
            .as_ref()
            .is_some_and(|sink| sink.started(session_id, client))
    }

    /// Fails a [`ConnectBehavior::Manual`] connect.
    pub fn fail_session(&self, reason: &str) -> bool {
        let state = self.state.lock();
        state
            .session_sink
            .as_ref()
            .is_some_and(|sink| sink.start_failed(reason))
    }

    pub fn suspend_session(&self, reason: &str) -> bool {
        let state = self.state.lock();
        state
            .session_sink
            .as_ref()
            .is_some_and(|sink| sink.suspended(reason))
    }

    /// Resumes a suspended session, or rejoins one already running on the
    /// receiver while a [`ConnectBehavior::Manual`] connect is pending.
    pub fn resume_session(&self) -> bool {
        let mut state = self.state.lock();
        let session_id = state.session_id.get_or_insert_with(new_session_id).clone();
        let client: Arc<dyn RemoteMediaClient> = self.client.clone();
        state
            .session_sink
            .as_ref()
            .is_some_and(|sink| sink.resumed(session_id, Some(client)))
    }

    /// Ends the session as if the receiver went away.
    pub fn end_session_remotely(&self, error: Option<&str>) -> bool {
        let mut state = self.state.lock();
        state.session_id = None;
        state
            .session_sink
            .as_ref()
            .is_some_and(|sink| sink.ended(error.map(ToString::to_string)))
    }

    fn initial_client(&self, state: &SimState) -> Option<Arc<dyn RemoteMediaClient>> {
        if state.client_after_probes == 0 {
            let client: Arc<dyn RemoteMediaClient> = self.client.clone();
            Some(client)
        } else {
            None
        }
    }
}

fn new_session_id() -> String {
    format!("sim-{}", uuid::Uuid::new_v4())
}

impl DiscoveryBackend for SimulatedBackend {
    fn start_discovery(&self, sink: DiscoverySink) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.start_discovery += 1;
        if !state.available {
            return Err(BackendError::Unavailable(
                "simulated runtime disabled".to_string(),
            ));
        }
        for device in &state.devices {
            sink.device_added(device.clone());
        }
        state.discovery_sink = Some(sink);
        Ok(())
    }

    fn stop_discovery(&self) {
        let mut state = self.state.lock();
        state.calls.stop_discovery += 1;
        state.discovery_sink = None;
    }
}

impl SessionBackend for SimulatedBackend {
    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn connect(&self, device: &Device, sink: SessionSink) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.connect += 1;
        log::debug!("[Simulated] Connect to {} ({})", device.name, device.id);

        match state.connect_behavior.clone() {
            ConnectBehavior::Reject(reason) => return Err(BackendError::Rejected(reason)),
            ConnectBehavior::Fail(reason) => {
                sink.start_failed(reason);
            }
            ConnectBehavior::Start => {
                let session_id = new_session_id();
                state.session_id = Some(session_id.clone());
                state.probes_this_session = 0;
                sink.started(session_id, self.initial_client(&state));
            }
            ConnectBehavior::Manual => {}
        }

        state.session_sink = Some(sink);
        Ok(())
    }

    fn end_session(&self, session_id: &str) -> BackendResult<()> {
        let mut state = self.state.lock();
        state.calls.end_session += 1;
        if state.session_id.as_deref() != Some(session_id) {
            return Err(BackendError::Failed(format!(
                "unknown session {}",
                session_id
            )));
        }
        if state.auto_end {
            state.session_id = None;
            if let Some(sink) = state.session_sink.as_ref() {
                sink.ended(None);
            }
        }
        Ok(())
    }

    fn remote_media_client(&self, session_id: &str) -> Option<Arc<dyn RemoteMediaClient>> {
        let mut state = self.state.lock();
        state.calls.client_probes += 1;
        if state.session_id.as_deref() != Some(session_id) {
            return None;
        }
        if state.probes_this_session < state.client_after_probes {
            state.probes_this_session += 1;
            return None;
        }
        let client: Arc<dyn RemoteMediaClient> = self.client.clone();
        Some(client)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Media Client
// ─────────────────────────────────────────────────────────────────────────────

/// Media client that records every call it receives.
#[derive(Default)]
pub struct SimulatedMediaClient {
    calls: Mutex<Vec<MediaCommand>>,
    fail_with: Mutex<Option<String>>,
}

impl SimulatedMediaClient {
    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<MediaCommand> {
        self.calls.lock().clone()
    }

    /// Descriptors passed to `load`, oldest first.
    pub fn loads(&self) -> Vec<MediaDescriptor> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                MediaCommand::Load(descriptor) => Some(descriptor.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes every following call fail with `reason` (or succeed again on `None`).
    pub fn fail_with(&self, reason: Option<&str>) {
        *self.fail_with.lock() = reason.map(ToString::to_string);
    }

    fn record(&self, call: MediaCommand) -> BackendResult<()> {
        self.calls.lock().push(call);
        match self.fail_with.lock().as_ref() {
            Some(reason) => Err(BackendError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteMediaClient for SimulatedMediaClient {
    async fn load(&self, descriptor: &MediaDescriptor) -> BackendResult<()> {
        self.record(MediaCommand::Load(descriptor.clone()))
    }

    async fn play(&self) -> BackendResult<()> {
        self.record(MediaCommand::Play)
    }

    async fn pause(&self) -> BackendResult<()> {
        self.record(MediaCommand::Pause)
    }

    async fn seek(&self, position_ms: u64) -> BackendResult<()> {
        self.record(MediaCommand::Seek { position_ms })
    }

    async fn stop(&self) -> BackendResult<()> {
        self.record(MediaCommand::Stop)
    }
}
