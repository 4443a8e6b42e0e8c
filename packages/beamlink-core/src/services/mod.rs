//! Application services layer.
//!
//! The orchestrator owns discovery and session state; the dispatcher is the
//! cloneable handle callers use to reach it.

pub mod dispatcher;
pub(crate) mod orchestrator;

pub use dispatcher::CastDispatcher;
pub use orchestrator::Orchestrator;
