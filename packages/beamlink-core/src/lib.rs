//! Beamlink Core - session orchestration for casting video to network receivers.
//!
//! A caller issues named commands (`discoverDevices`, `connectToDevice`,
//! `shareVideo`, `controlPlayback`, `disconnect`, ...) and gets exactly one
//! reply per command. Behind the dispatcher a single orchestrator task owns
//! the discovery window, the device registry and the session state machine,
//! and talks to the platform only through the collaborator traits.
//!
//! # Architecture
//!
//! - [`services`]: Orchestrator task and the [`CastDispatcher`] handle
//! - [`backend`]: Collaborator traits plus the mDNS and simulated backends
//! - [`discovery`]: Timed discovery windows and the deduplicating registry
//! - [`session`]: Session state machine
//! - [`readiness`]: Bounded polling for late platform resources
//! - [`media`]: Media descriptors and content type inference
//! - [`events`]: Event system for real-time client communication
//! - [`api`]: HTTP/WebSocket surface over the dispatcher
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`DiscoveryBackend`](backend::DiscoveryBackend): Browsing for receivers
//! - [`SessionBackend`](backend::SessionBackend): Starting and ending sessions
//! - [`RemoteMediaClient`](backend::RemoteMediaClient): Controlling playback
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod backend;
pub mod bootstrap;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod media;
pub mod protocol_constants;
pub mod readiness;
pub mod runtime;
pub mod services;
pub mod session;
pub mod utils;

// Re-export commonly used types at the crate root
pub use command::{CastCommand, CommandReply, PlaybackControl};
pub use config::{CapabilityCheck, CastConfig};
pub use error::{CastError, CastResult, ErrorPayload};
pub use events::{BroadcastEvent, BroadcastEventBridge, EventEmitter};
pub use media::{infer_content_type, MediaCommand, MediaDescriptor};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use session::{PlaybackState, SessionSnapshot, SessionState};
pub use utils::{now_millis, platform_version};

// Re-export collaborator types
pub use backend::{
    BackendError, BackendResult, Device, DeviceEvent, DiscoveryBackend, DiscoverySink,
    MdnsDiscovery, RemoteMediaClient, SessionBackend, SessionEvent, SessionSink, SimulatedBackend,
};

// Re-export service types
pub use services::{CastDispatcher, Orchestrator};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, BootstrappedServices};

// Re-export API types
pub use api::{start_server, AppState, ServerError};
