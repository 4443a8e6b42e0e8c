//! Platform collaborators: discovery, sessions and remote media control.

pub mod mdns;
pub mod simulated;
mod sink;
mod traits;
mod types;

pub use mdns::MdnsDiscovery;
pub use simulated::{CallCounts, ConnectBehavior, SimulatedBackend, SimulatedMediaClient};
pub use sink::{DiscoverySink, SessionSink};
pub use traits::{CastBackend, DiscoveryBackend, RemoteMediaClient, SessionBackend};
pub use types::{BackendError, BackendResult, Device, DeviceEvent, DeviceKind, SessionEvent};
