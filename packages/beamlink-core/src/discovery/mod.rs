//! Time-boxed receiver discovery.

mod registry;
mod window;

pub use registry::DeviceRegistry;
pub use window::{DiscoveryWindow, DiscoveryWindowManager};
