//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use beamlink_core::protocol_constants::DEFAULT_SERVER_PORT;
use beamlink_core::CastConfig;
use clap::ValueEnum;
use serde::Deserialize;

/// Where discovery results come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Scripted receivers from `simulated_devices`.
    #[default]
    Simulated,
    /// Cast receivers browsed over mDNS on the local network.
    Mdns,
}

/// A receiver the simulated backend announces in every discovery window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulatedDevice {
    pub id: String,
    pub name: String,
}

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_address: IpAddr,

    /// Port to bind the HTTP server to.
    /// Override: `BEAMLINK_BIND_PORT`
    pub bind_port: u16,

    /// Discovery source.
    pub discovery: DiscoverySource,

    /// Orchestrator tuning.
    /// `cast.discovery_window_ms` override: `BEAMLINK_DISCOVERY_WINDOW_MS`
    pub cast: CastConfig,

    /// Receivers announced in `simulated` mode.
    pub simulated_devices: Vec<SimulatedDevice>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            bind_port: DEFAULT_SERVER_PORT,
            discovery: DiscoverySource::default(),
            cast: CastConfig::default(),
            simulated_devices: vec![SimulatedDevice {
                id: "sim-living-room".to_string(),
                name: "Living Room TV".to_string(),
            }],
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies overrides from `lookup` (the process environment outside tests).
    ///
    /// Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("BEAMLINK_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(ms) = lookup("BEAMLINK_DISCOVERY_WINDOW_MS").and_then(|v| v.parse().ok()) {
            self.cast.discovery_window_ms = ms;
        }

        // Note: the log level is handled by clap via #[arg(env = ...)] in main.rs
    }
}
