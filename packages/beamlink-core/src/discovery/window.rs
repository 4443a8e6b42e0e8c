//! Discovery window bookkeeping.
//!
//! At most one window is open at a time. Opening a window clears the
//! registry; closing it freezes a snapshot, which is both delivered to the
//! waiting caller and kept as the lookup table for later connects.

use crate::backend::{Device, DeviceEvent};
use crate::error::{CastError, CastResult};
use crate::utils::now_millis;

use super::registry::DeviceRegistry;

/// A single open discovery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryWindow {
    pub id: u64,
    pub started_at: u64,
    pub duration_ms: u64,
}

enum WindowState<W> {
    Closed,
    Open { window: DiscoveryWindow, waiter: W },
}

/// Owns the registry and the open/closed window state.
///
/// `W` is whatever the caller needs back when the window closes; the
/// orchestrator stores the pending command reply there.
pub struct DiscoveryWindowManager<W> {
    state: WindowState<W>,
    registry: DeviceRegistry,
    last_result: Vec<Device>,
    next_id: u64,
}

impl<W> Default for DiscoveryWindowManager<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> DiscoveryWindowManager<W> {
    pub fn new() -> Self {
        Self {
            state: WindowState::Closed,
            registry: DeviceRegistry::new(),
            last_result: Vec::new(),
            next_id: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, WindowState::Open { .. })
    }

    fn current(&self) -> Option<DiscoveryWindow> {
        match &self.state {
            WindowState::Open { window, .. } => Some(*window),
            WindowState::Closed => None,
        }
    }

    /// Fails with [`CastError::DiscoveryAlreadyActive`] while a window is open.
    pub fn ensure_closed(&self) -> CastResult<()> {
        if self.is_open() {
            Err(CastError::DiscoveryAlreadyActive)
        } else {
            Ok(())
        }
    }

    /// Reserves the id for the next window.
    ///
    /// The id is handed to the discovery collaborator before the window is
    /// actually opened, so events it reports synchronously are tagged correctly.
    pub fn reserve_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Opens window `id`, clearing the registry.
    pub fn open(&mut self, id: u64, duration_ms: u64, waiter: W) -> DiscoveryWindow {
        let window = DiscoveryWindow {
            id,
            started_at: now_millis(),
            duration_ms,
        };
        self.registry.clear();
        self.state = WindowState::Open { window, waiter };
        window
    }

    /// Applies a device event if it belongs to the open window.
    ///
    /// Returns `false` for events from a closed or replaced window.
    pub fn record(&mut self, window_id: u64, event: DeviceEvent) -> bool {
        if !self.is_current(window_id) {
            return false;
        }
        match event {
            DeviceEvent::Added(device) => self.registry.on_device_added(device),
            DeviceEvent::Removed(id) => self.registry.on_device_removed(&id),
        }
    }

    pub fn is_current(&self, window_id: u64) -> bool {
        self.current().is_some_and(|w| w.id == window_id)
    }

    /// Closes window `window_id`, returning the snapshot and the waiter.
    pub fn close(&mut self, window_id: u64) -> Option<(Vec<Device>, W)> {
        if !self.is_current(window_id) {
            return None;
        }
        let WindowState::Open { waiter, .. } =
            std::mem::replace(&mut self.state, WindowState::Closed)
        else {
            return None;
        };
        self.last_result = self.registry.snapshot();
        Some((self.last_result.clone(), waiter))
    }

    /// Closes whatever window is open without producing a result.
    pub fn abort(&mut self) -> Option<W> {
        match std::mem::replace(&mut self.state, WindowState::Closed) {
            WindowState::Open { waiter, .. } => Some(waiter),
            WindowState::Closed => None,
        }
    }

    /// Looks `device_id` up in the last completed window's snapshot.
    pub fn find_device(&self, device_id: &str) -> Option<&Device> {
        self.last_result.iter().find(|d| d.id == device_id)
    }

    /// Number of devices in the open window's registry.
    pub fn device_count(&self) -> usize {
        self.registry.len()
    }
}
