//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DISCOVERY_WINDOW_MS, DEFAULT_END_TIMEOUT_MS,
    DEFAULT_READINESS_INTERVAL_MS, DEFAULT_READINESS_MAX_ATTEMPTS, DEFAULT_RESUME_GRACE_MS,
    MAX_DISCOVERY_WINDOW_MS, MIN_DISCOVERY_WINDOW_MS,
};
use crate::readiness::PollPolicy;

/// How `isSupported` / `initialize` decide whether casting is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCheck {
    /// Ask the session collaborator whether its runtime is present.
    #[default]
    Probe,
    /// Report support unconditionally (hosts where the runtime is always bundled).
    AlwaysSupported,
}

/// Tunables for discovery windows, readiness polling and session timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CastConfig {
    /// Length of a discovery window when the caller gives no `durationMs`.
    pub discovery_window_ms: u64,
    /// Delay between remote media client probes.
    pub readiness_interval_ms: u64,
    /// Number of probes before a readiness wait fails.
    pub readiness_max_attempts: u32,
    /// Upper bound on `Connecting` before the connect fails.
    pub connect_timeout_ms: u64,
    /// Upper bound on `Ending` before the session is forced idle.
    pub end_timeout_ms: u64,
    /// How long a suspended session waits for a resume.
    pub resume_grace_ms: u64,
    /// Capability detection strategy.
    pub capability_check: CapabilityCheck,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            discovery_window_ms: DEFAULT_DISCOVERY_WINDOW_MS,
            readiness_interval_ms: DEFAULT_READINESS_INTERVAL_MS,
            readiness_max_attempts: DEFAULT_READINESS_MAX_ATTEMPTS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            end_timeout_ms: DEFAULT_END_TIMEOUT_MS,
            resume_grace_ms: DEFAULT_RESUME_GRACE_MS,
            capability_check: CapabilityCheck::default(),
        }
    }
}

impl CastConfig {
    /// Validates the configuration values.
    ///
    /// Returns an error message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_DISCOVERY_WINDOW_MS..=MAX_DISCOVERY_WINDOW_MS).contains(&self.discovery_window_ms)
        {
            return Err(format!(
                "discovery_window_ms must be between {} and {}",
                MIN_DISCOVERY_WINDOW_MS, MAX_DISCOVERY_WINDOW_MS
            ));
        }
        if self.readiness_interval_ms == 0 {
            return Err("readiness_interval_ms must be greater than 0".to_string());
        }
        if self.readiness_max_attempts == 0 {
            return Err("readiness_max_attempts must be at least 1".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be greater than 0".to_string());
        }
        if self.end_timeout_ms == 0 {
            return Err("end_timeout_ms must be greater than 0".to_string());
        }
        if self.resume_grace_ms == 0 {
            return Err("resume_grace_ms must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Window length for a discovery request, clamping caller overrides.
    #[must_use]
    pub fn discovery_window(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms
            .map(|ms| ms.clamp(MIN_DISCOVERY_WINDOW_MS, MAX_DISCOVERY_WINDOW_MS))
            .unwrap_or(self.discovery_window_ms);
        Duration::from_millis(ms)
    }

    /// Poll policy for remote media client readiness.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.readiness_interval_ms),
            max_attempts: self.readiness_max_attempts,
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn end_timeout(&self) -> Duration {
        Duration::from_millis(self.end_timeout_ms)
    }

    #[must_use]
    pub fn resume_grace(&self) -> Duration {
        Duration::from_millis(self.resume_grace_ms)
    }
}
