//! Single-owner command orchestrator.
//!
//! All mutable state (the discovery window, the device registry, the session
//! machine and every pending reply) is owned by one task. Commands arrive
//! from [`CastDispatcher`] handles, collaborator callbacks arrive through
//! the tagged sinks, and timers, readiness polls and remote media calls run
//! as spawned tasks that post their outcome back into the same inbox. The
//! task handles one message at a time and never awaits collaborator work
//! inline, so a slow receiver cannot stall unrelated commands.
//!
//! # Pending operations
//!
//! - one discovery window (its reply is held by the window manager)
//! - one connect (`Connecting`)
//! - one load or transport command (waiting for the media client or the receiver)
//! - one disconnect (`Ending`)

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::backend::{
    BackendResult, Device, DeviceEvent, DiscoveryBackend, DiscoverySink, RemoteMediaClient,
    SessionBackend, SessionEvent, SessionSink,
};
use crate::command::{CastCommand, CommandReply, ConnectArgs, DiscoverArgs, ShareVideoArgs};
use crate::config::{CapabilityCheck, CastConfig};
use crate::discovery::DiscoveryWindowManager;
use crate::error::{CastError, CastResult};
use crate::events::{DiscoveryNotice, EventEmitter, PlaybackNotice, SessionNotice};
use crate::media::MediaCommand;
use crate::protocol_constants::MEDIA_CLIENT_RESOURCE;
use crate::readiness::{PollRequest, ReadinessError};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::session::{ConnectPlan, DisconnectPlan, PlaybackState, SessionMachine, SessionState};
use crate::utils::{now_millis, platform_version};

use super::dispatcher::CastDispatcher;

pub(crate) type Reply = oneshot::Sender<CastResult<CommandReply>>;

/// Everything the orchestrator task reacts to.
pub(crate) enum Inbound {
    Command {
        command: CastCommand,
        reply: Reply,
    },
    Device {
        window_id: u64,
        event: DeviceEvent,
    },
    Session {
        epoch: u64,
        event: SessionEvent,
    },
    Timer(Timer),
    ClientReady {
        op_id: u64,
        result: Result<Arc<dyn RemoteMediaClient>, ReadinessError>,
    },
    MediaDone {
        op_id: u64,
        result: BackendResult<()>,
    },
    /// The pre-disconnect `stop` finished (successfully or not).
    MediaStopped {
        epoch: u64,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Timer {
    WindowElapsed { window_id: u64 },
    ConnectTimeout { epoch: u64 },
    EndTimeout { epoch: u64 },
    ResumeGrace { epoch: u64, suspension: u64 },
}

enum Stage {
    AwaitingClient,
    Running,
}

/// The load or transport command currently in progress.
struct InFlight {
    op_id: u64,
    command: MediaCommand,
    stage: Stage,
    cancel: CancellationToken,
    reply: Reply,
}

/// Owner of discovery and session state. See the module docs.
pub struct Orchestrator {
    config: CastConfig,
    discovery: Arc<dyn DiscoveryBackend>,
    sessions: Arc<dyn SessionBackend>,
    emitter: Arc<dyn EventEmitter>,
    spawner: TokioSpawner,
    tx: mpsc::UnboundedSender<Inbound>,
    cancel: CancellationToken,

    windows: DiscoveryWindowManager<Reply>,
    machine: SessionMachine,
    pending_connect: Option<Reply>,
    pending_disconnect: Option<Reply>,
    in_flight: Option<InFlight>,
    next_op_id: u64,
    suspension: u64,
}

impl Orchestrator {
    /// Spawns the orchestrator task and returns a dispatcher for it.
    ///
    /// The task runs until `cancel` fires; every reply still pending at that
    /// point is answered with [`CastError::Internal`].
    pub fn spawn(
        config: CastConfig,
        discovery: Arc<dyn DiscoveryBackend>,
        sessions: Arc<dyn SessionBackend>,
        emitter: Arc<dyn EventEmitter>,
        spawner: TokioSpawner,
        cancel: CancellationToken,
    ) -> CastDispatcher {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            config,
            discovery,
            sessions,
            emitter,
            spawner: spawner.clone(),
            tx: tx.clone(),
            cancel,
            windows: DiscoveryWindowManager::new(),
            machine: SessionMachine::new(),
            pending_connect: None,
            pending_disconnect: None,
            in_flight: None,
            next_op_id: 0,
            suspension: 0,
        };
        spawner.spawn(orchestrator.run(rx));
        CastDispatcher::new(tx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Inbound>) {
        log::info!("[Orchestrator] Started");
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }

        self.teardown();

        rx.close();
        while let Ok(message) = rx.try_recv() {
            if let Inbound::Command { reply, .. } = message {
                respond(reply, Err(stopped()));
            }
        }
        log::info!("[Orchestrator] Stopped");
    }

    fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Command { command, reply } => self.handle_command(command, reply),
            Inbound::Device { window_id, event } => self.on_device_event(window_id, event),
            Inbound::Session { epoch, event } => self.on_session_event(epoch, event),
            Inbound::Timer(timer) => self.on_timer(timer),
            Inbound::ClientReady { op_id, result } => self.on_client_ready(op_id, result),
            Inbound::MediaDone { op_id, result } => self.on_media_done(op_id, result),
            Inbound::MediaStopped { epoch } => self.end_remote_session(epoch),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_command(&mut self, command: CastCommand, reply: Reply) {
        log::debug!(
            "[Dispatcher] {} (session {})",
            command.name(),
            self.machine.state()
        );

        match command {
            CastCommand::GetPlatformVersion => {
                respond(reply, Ok(CommandReply::Text(platform_version())));
            }
            CastCommand::Initialize => {
                let supported = self.is_supported();
                log::info!("[Session] Initialized, casting supported: {}", supported);
                respond(reply, Ok(CommandReply::Bool(supported)));
            }
            CastCommand::IsSupported => {
                respond(reply, Ok(CommandReply::Bool(self.is_supported())));
            }
            CastCommand::DiscoverDevices(args) => self.start_discovery(args, reply),
            CastCommand::ConnectToDevice(args) => self.connect(args, reply),
            CastCommand::ShareVideo(args) => self.share_video(args, reply),
            CastCommand::ControlPlayback(control) => {
                self.start_media_command(control.to_media_command(), reply);
            }
            CastCommand::Disconnect => self.disconnect(reply),
            CastCommand::GetSessionState => {
                respond(reply, Ok(CommandReply::Session(self.machine.snapshot())));
            }
        }
    }

    fn is_supported(&self) -> bool {
        match self.config.capability_check {
            CapabilityCheck::AlwaysSupported => true,
            CapabilityCheck::Probe => self.sessions.is_available(),
        }
    }

    fn require_support(&self) -> CastResult<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(CastError::Unsupported(
                "casting runtime is not available".to_string(),
            ))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────────

    fn start_discovery(&mut self, args: DiscoverArgs, reply: Reply) {
        if let Err(e) = self
            .require_support()
            .and_then(|()| self.windows.ensure_closed())
        {
            return respond(reply, Err(e));
        }

        let duration = self.config.discovery_window(args.duration_ms);
        let window_id = self.windows.reserve_id();
        let sink = DiscoverySink::new(window_id, self.tx.clone());

        if let Err(e) = self.discovery.start_discovery(sink) {
            log::error!("[Discovery] Failed to start window {}: {}", window_id, e);
            return respond(reply, Err(CastError::DiscoveryFailed(e.to_string())));
        }

        let duration_ms = duration.as_millis() as u64;
        self.windows.open(window_id, duration_ms, reply);
        log::info!(
            "[Discovery] Window {} open for {}ms",
            window_id,
            duration_ms
        );
        self.emitter.emit_discovery(DiscoveryNotice::WindowOpened {
            window_id,
            duration_ms,
            timestamp: now_millis(),
        });
        self.schedule(duration, Timer::WindowElapsed { window_id });
    }

    fn on_device_event(&mut self, window_id: u64, event: DeviceEvent) {
        let timestamp = now_millis();
        let notice = match &event {
            DeviceEvent::Added(device) => DiscoveryNotice::DeviceFound {
                window_id,
                device: device.clone(),
                timestamp,
            },
            DeviceEvent::Removed(device_id) => DiscoveryNotice::DeviceLost {
                window_id,
                device_id: device_id.clone(),
                timestamp,
            },
        };

        if self.windows.record(window_id, event) {
            log::debug!(
                "[Discovery] Window {} now holds {} device(s)",
                window_id,
                self.windows.device_count()
            );
            self.emitter.emit_discovery(notice);
        } else {
            log::trace!(
                "[Discovery] Ignored device event for window {} (stale or duplicate)",
                window_id
            );
        }
    }

    fn close_window(&mut self, window_id: u64) {
        if !self.windows.is_current(window_id) {
            return;
        }
        self.discovery.stop_discovery();

        let Some((devices, reply)) = self.windows.close(window_id) else {
            return;
        };
        let devices = self.with_connection_flags(devices);

        log::info!(
            "[Discovery] Window {} closed with {} device(s)",
            window_id,
            devices.len()
        );
        self.emitter.emit_discovery(DiscoveryNotice::WindowClosed {
            window_id,
            devices: devices.clone(),
            timestamp: now_millis(),
        });
        respond(reply, Ok(CommandReply::Devices(devices)));
    }

    fn with_connection_flags(&self, mut devices: Vec<Device>) -> Vec<Device> {
        let connected_id = match self.machine.state() {
            SessionState::Connected | SessionState::Suspended => {
                self.machine.device().map(|d| d.id.clone())
            }
            _ => None,
        };
        for device in &mut devices {
            device.connected = connected_id.as_deref() == Some(device.id.as_str());
        }
        devices
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    fn connect(&mut self, args: ConnectArgs, reply: Reply) {
        if let Err(e) = self.require_support() {
            return respond(reply, Err(e));
        }

        let Some(device) = self.windows.find_device(&args.device_id).cloned() else {
            log::warn!(
                "[Session] Device {} is not in the last discovery result",
                args.device_id
            );
            return respond(reply, Err(CastError::DeviceNotFound(args.device_id)));
        };
        if let Some(name) = args.device_name.as_deref().filter(|n| *n != device.name) {
            log::debug!(
                "[Session] Caller named {} '{}', discovery reported '{}'",
                device.id,
                name,
                device.name
            );
        }

        let epoch = match self.machine.begin_connect(device.clone()) {
            Err(e) => return respond(reply, Err(e)),
            Ok(ConnectPlan::AlreadyConnected) => {
                log::debug!("[Session] Already connected to {}", device.id);
                return respond(reply, Ok(CommandReply::Bool(true)));
            }
            Ok(ConnectPlan::Connect { epoch }) => epoch,
        };

        log::info!(
            "[Session] Connecting to {} ({}), epoch {}",
            device.name,
            device.id,
            epoch
        );
        let sink = SessionSink::new(epoch, self.tx.clone());
        if let Err(e) = self.sessions.connect(&device, sink) {
            log::error!("[Session] Connect request to {} failed: {}", device.id, e);
            self.machine.abort_connect(epoch);
            self.notify_state(Some(e.to_string()));
            return respond(reply, Err(CastError::ConnectionError(e.to_string())));
        }

        self.pending_connect = Some(reply);
        self.notify_state(None);
        self.schedule(self.config.connect_timeout(), Timer::ConnectTimeout { epoch });
    }

    fn disconnect(&mut self, reply: Reply) {
        match self.machine.begin_disconnect() {
            Err(e) => respond(reply, Err(e)),
            Ok(DisconnectPlan::AlreadyIdle) => {
                log::debug!("[Session] Disconnect without a session");
                respond(reply, Ok(CommandReply::Bool(true)));
            }
            Ok(DisconnectPlan::End {
                session_id,
                stop_media,
            }) => {
                log::info!("[Session] Ending session {}", session_id);
                self.cancel_in_flight("session ending");

                let epoch = self.machine.epoch();
                self.pending_disconnect = Some(reply);
                self.notify_state(None);
                self.schedule(self.config.end_timeout(), Timer::EndTimeout { epoch });

                match stop_media {
                    Some(client) => {
                        let tx = self.tx.clone();
                        self.spawner.spawn(async move {
                            if let Err(e) = client.stop().await {
                                log::warn!("[Playback] Stop before disconnect failed: {}", e);
                            }
                            let _ = tx.send(Inbound::MediaStopped { epoch });
                        });
                    }
                    None => self.end_remote_session(epoch),
                }
            }
        }
    }

    /// Asks the collaborator to end the session that is `Ending` in `epoch`.
    fn end_remote_session(&mut self, epoch: u64) {
        if epoch != self.machine.epoch() || self.machine.state() != SessionState::Ending {
            return;
        }
        let Some(session_id) = self.machine.session().map(|s| s.id().to_string()) else {
            return;
        };

        if let Err(e) = self.sessions.end_session(&session_id) {
            log::warn!(
                "[Session] End request for {} failed: {}, forcing idle",
                session_id,
                e
            );
            self.machine.force_idle();
            self.after_session_ended(SessionState::Ending, Some(e.to_string()));
        }
    }

    fn on_session_event(&mut self, epoch: u64, event: SessionEvent) {
        if epoch != self.machine.epoch() {
            log::debug!(
                "[Session] Ignoring {} from stale epoch {} (current {})",
                event.name(),
                epoch,
                self.machine.epoch()
            );
            return;
        }

        match event {
            SessionEvent::Started { session_id, client } => {
                log::info!("[Session] Session {} started", session_id);
                if self.machine.on_started(epoch, session_id, client) {
                    if let Some(reply) = self.pending_connect.take() {
                        respond(reply, Ok(CommandReply::Bool(true)));
                    }
                    self.notify_state(None);
                }
            }
            SessionEvent::Resumed { session_id, client } => {
                log::info!("[Session] Session {} resumed", session_id);
                if self.machine.on_resumed(epoch, session_id, client) {
                    if let Some(reply) = self.pending_connect.take() {
                        respond(reply, Ok(CommandReply::Bool(true)));
                    }
                    self.notify_state(Some("resumed".to_string()));
                }
            }
            SessionEvent::StartFailed { reason } => {
                if self.machine.abort_connect(epoch).is_some() {
                    log::warn!("[Session] Session failed to start: {}", reason);
                    if let Some(reply) = self.pending_connect.take() {
                        respond(reply, Err(CastError::ConnectionError(reason.clone())));
                    }
                    self.notify_state(Some(reason));
                }
            }
            SessionEvent::Suspended { reason } => {
                if self.machine.on_suspended(epoch) {
                    log::warn!("[Session] Session suspended: {}", reason);
                    self.cancel_in_flight("session suspended");
                    self.suspension += 1;
                    self.schedule(
                        self.config.resume_grace(),
                        Timer::ResumeGrace {
                            epoch,
                            suspension: self.suspension,
                        },
                    );
                    self.notify_state(Some(reason));
                }
            }
            SessionEvent::Ended { error } => {
                if let Some(previous) = self.machine.on_ended(epoch) {
                    self.after_session_ended(previous, error);
                }
            }
        }
    }

    /// Settles everything that depended on the session that just ended.
    fn after_session_ended(&mut self, previous: SessionState, reason: Option<String>) {
        self.cancel_in_flight("session ended");

        if previous == SessionState::Connecting {
            if let Some(reply) = self.pending_connect.take() {
                let message = reason
                    .clone()
                    .unwrap_or_else(|| "session ended before it started".to_string());
                respond(reply, Err(CastError::ConnectionError(message)));
            }
        }
        if let Some(reply) = self.pending_disconnect.take() {
            respond(reply, Ok(CommandReply::Bool(true)));
        }

        match &reason {
            Some(reason) => log::info!("[Session] Session ended from {}: {}", previous, reason),
            None => log::info!("[Session] Session ended from {}", previous),
        }
        self.notify_state(reason);
    }

    fn notify_state(&self, reason: Option<String>) {
        let snapshot = self.machine.snapshot();
        self.emitter.emit_session(SessionNotice::StateChanged {
            state: snapshot.state,
            session_id: snapshot.session_id,
            device_id: snapshot.device.map(|d| d.id),
            reason,
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Media
    // ─────────────────────────────────────────────────────────────────────────

    fn share_video(&mut self, args: ShareVideoArgs, reply: Reply) {
        match args.descriptor() {
            Ok(descriptor) => self.start_media_command(MediaCommand::Load(descriptor), reply),
            Err(e) => respond(reply, Err(e)),
        }
    }

    fn start_media_command(&mut self, command: MediaCommand, reply: Reply) {
        let session_id = match self.machine.state() {
            SessionState::Connected => self.machine.session().map(|s| s.id().to_string()),
            SessionState::Idle => None,
            state => {
                return respond(
                    reply,
                    Err(CastError::SessionBusy(format!("session is {}", state))),
                );
            }
        };
        let Some(session_id) = session_id else {
            return respond(reply, Err(CastError::NoActiveSession));
        };
        if self.in_flight.is_some() {
            return respond(
                reply,
                Err(CastError::SessionBusy(
                    "another media command is in progress".to_string(),
                )),
            );
        }

        self.next_op_id += 1;
        let op_id = self.next_op_id;
        let cancel = self.cancel.child_token();

        let stage = match self.machine.client() {
            Some(client) => {
                self.spawn_media_call(op_id, client, command.clone(), cancel.clone());
                Stage::Running
            }
            None => {
                log::debug!(
                    "[Readiness] Waiting for the media client of {} before {}",
                    session_id,
                    command.name()
                );
                self.spawn_client_poll(op_id, session_id, cancel.clone());
                Stage::AwaitingClient
            }
        };

        self.in_flight = Some(InFlight {
            op_id,
            command,
            stage,
            cancel,
            reply,
        });
    }

    fn spawn_client_poll(&self, op_id: u64, session_id: String, cancel: CancellationToken) {
        let sessions = Arc::clone(&self.sessions);
        let request = PollRequest::new(
            MEDIA_CLIENT_RESOURCE,
            self.config.poll_policy(),
            move || sessions.remote_media_client(&session_id),
        );
        let tx = self.tx.clone();

        self.spawner.spawn(async move {
            let result = request.run(&cancel).await;
            let _ = tx.send(Inbound::ClientReady { op_id, result });
        });
    }

    fn spawn_media_call(
        &self,
        op_id: u64,
        client: Arc<dyn RemoteMediaClient>,
        command: MediaCommand,
        cancel: CancellationToken,
    ) {
        let tx = self.tx.clone();
        self.spawner.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = run_media_command(client.as_ref(), &command) => {
                    let _ = tx.send(Inbound::MediaDone { op_id, result });
                }
            }
        });
    }

    fn on_client_ready(
        &mut self,
        op_id: u64,
        result: Result<Arc<dyn RemoteMediaClient>, ReadinessError>,
    ) {
        let Some(mut flight) = self.take_in_flight(op_id) else {
            return;
        };

        match result {
            Ok(client) => {
                if !self.machine.bind_client(Arc::clone(&client)) {
                    return respond(
                        flight.reply,
                        Err(CastError::ReadinessCancelled(
                            MEDIA_CLIENT_RESOURCE.to_string(),
                        )),
                    );
                }
                self.spawn_media_call(
                    op_id,
                    client,
                    flight.command.clone(),
                    flight.cancel.clone(),
                );
                flight.stage = Stage::Running;
                self.in_flight = Some(flight);
            }
            Err(e) => {
                log::warn!(
                    "[Readiness] Giving up on {}: {}",
                    flight.command.name(),
                    e
                );
                respond(flight.reply, Err(e.into()));
            }
        }
    }

    fn on_media_done(&mut self, op_id: u64, result: BackendResult<()>) {
        let Some(flight) = self.take_in_flight(op_id) else {
            return;
        };
        let session_id = self
            .machine
            .session()
            .map(|s| s.id().to_string())
            .unwrap_or_default();
        let timestamp = now_millis();

        match result {
            Ok(()) => {
                self.apply_playback(&flight.command);
                let notice = match &flight.command {
                    MediaCommand::Load(descriptor) => {
                        log::info!(
                            "[Playback] Loaded {} ({})",
                            descriptor.url(),
                            descriptor.content_type()
                        );
                        PlaybackNotice::MediaLoaded {
                            session_id,
                            url: descriptor.url().to_string(),
                            title: descriptor.title().to_string(),
                            content_type: descriptor.content_type().to_string(),
                            timestamp,
                        }
                    }
                    command => PlaybackNotice::ControlApplied {
                        session_id,
                        action: command.name().to_string(),
                        position_ms: match command {
                            MediaCommand::Seek { position_ms } => Some(*position_ms),
                            _ => None,
                        },
                        timestamp,
                    },
                };
                self.emitter.emit_playback(notice);
                respond(flight.reply, Ok(CommandReply::Bool(true)));
            }
            Err(e) => {
                log::warn!("[Playback] {} failed: {}", flight.command.name(), e);
                self.emitter.emit_playback(PlaybackNotice::CommandFailed {
                    session_id,
                    action: flight.command.name().to_string(),
                    error: e.to_string(),
                    timestamp,
                });
                let err = match flight.command {
                    MediaCommand::Load(_) => CastError::LoadFailed(e.to_string()),
                    _ => CastError::PlaybackFailed(e.to_string()),
                };
                respond(flight.reply, Err(err));
            }
        }
    }

    fn apply_playback(&mut self, command: &MediaCommand) {
        let playback = match command {
            MediaCommand::Load(descriptor) if descriptor.autoplay() => PlaybackState::Playing,
            MediaCommand::Load(_) | MediaCommand::Pause => PlaybackState::Paused,
            MediaCommand::Play => PlaybackState::Playing,
            MediaCommand::Stop => PlaybackState::Stopped,
            MediaCommand::Seek { .. } => return,
        };
        self.machine.set_playback(playback);
    }

    fn take_in_flight(&mut self, op_id: u64) -> Option<InFlight> {
        if self.in_flight.as_ref().is_some_and(|f| f.op_id == op_id) {
            self.in_flight.take()
        } else {
            log::trace!("[Playback] Dropping outcome of superseded operation {}", op_id);
            None
        }
    }

    /// Abandons the in-flight media command and answers its caller now.
    fn cancel_in_flight(&mut self, why: &str) {
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        flight.cancel.cancel();

        let err = match (&flight.stage, &flight.command) {
            (Stage::AwaitingClient, _) => {
                CastError::ReadinessCancelled(format!("{} ({})", MEDIA_CLIENT_RESOURCE, why))
            }
            (Stage::Running, MediaCommand::Load(_)) => CastError::LoadFailed(why.to_string()),
            (Stage::Running, command) => {
                CastError::PlaybackFailed(format!("{} interrupted: {}", command.name(), why))
            }
        };
        log::debug!(
            "[Playback] Cancelled {}: {}",
            flight.command.name(),
            why
        );
        respond(flight.reply, Err(err));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Timers
    // ─────────────────────────────────────────────────────────────────────────

    fn schedule(&self, after: Duration, timer: Timer) {
        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        self.spawner.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(Inbound::Timer(timer));
                }
            }
        });
    }

    fn on_timer(&mut self, timer: Timer) {
        match timer {
            Timer::WindowElapsed { window_id } => self.close_window(window_id),
            Timer::ConnectTimeout { epoch } => {
                if self.machine.abort_connect(epoch).is_some() {
                    let message = format!(
                        "no session after {}ms",
                        self.config.connect_timeout_ms
                    );
                    log::warn!("[Session] Connect timed out: {}", message);
                    if let Some(reply) = self.pending_connect.take() {
                        respond(reply, Err(CastError::ConnectionError(message.clone())));
                    }
                    self.notify_state(Some(message));
                }
            }
            Timer::EndTimeout { epoch } => {
                if epoch == self.machine.epoch() && self.machine.state() == SessionState::Ending {
                    log::warn!(
                        "[Session] No end confirmation after {}ms, forcing idle",
                        self.config.end_timeout_ms
                    );
                    self.machine.force_idle();
                    self.after_session_ended(
                        SessionState::Ending,
                        Some("end confirmation timed out".to_string()),
                    );
                }
            }
            Timer::ResumeGrace { epoch, suspension } => {
                let expired = epoch == self.machine.epoch()
                    && suspension == self.suspension
                    && self.machine.state() == SessionState::Suspended;
                if !expired {
                    return;
                }
                log::warn!(
                    "[Session] Not resumed within {}ms, dropping session",
                    self.config.resume_grace_ms
                );
                if let Some(session) = self.machine.force_idle() {
                    if let Err(e) = self.sessions.end_session(session.id()) {
                        log::debug!("[Session] End after suspension failed: {}", e);
                    }
                }
                self.after_session_ended(
                    SessionState::Suspended,
                    Some("not resumed in time".to_string()),
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────────

    fn teardown(&mut self) {
        if let Some(reply) = self.windows.abort() {
            self.discovery.stop_discovery();
            respond(reply, Err(stopped()));
        }
        self.cancel_in_flight("orchestrator stopped");
        if let Some(reply) = self.pending_connect.take() {
            respond(reply, Err(stopped()));
        }
        if let Some(reply) = self.pending_disconnect.take() {
            respond(reply, Err(stopped()));
        }
        if let Some(session) = self.machine.force_idle() {
            if let Err(e) = self.sessions.end_session(session.id()) {
                log::debug!("[Session] End on shutdown failed: {}", e);
            }
        }
    }
}

async fn run_media_command(
    client: &dyn RemoteMediaClient,
    command: &MediaCommand,
) -> BackendResult<()> {
    match command {
        MediaCommand::Load(descriptor) => client.load(descriptor).await,
        MediaCommand::Play => client.play().await,
        MediaCommand::Pause => client.pause().await,
        MediaCommand::Seek { position_ms } => client.seek(*position_ms).await,
        MediaCommand::Stop => client.stop().await,
    }
}

fn respond(reply: Reply, result: CastResult<CommandReply>) {
    if reply.send(result).is_err() {
        log::debug!("[Dispatcher] Caller went away before the reply");
    }
}

fn stopped() -> CastError {
    CastError::Internal("orchestrator stopped".to_string())
}
