//! Casting session lifecycle.

mod machine;

pub use machine::{
    ConnectPlan, DisconnectPlan, PlaybackState, Session, SessionMachine, SessionSnapshot,
    SessionState,
};
