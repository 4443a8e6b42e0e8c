//! mDNS/DNS-SD receiver discovery.
//!
//! Browses for `_googlecast._tcp.local.` services and reports resolved
//! receivers into the discovery sink of the current window.
//!
//! - The receiver id comes from the `id` TXT record, falling back to the
//!   service instance name
//! - The display name comes from the `fn` TXT record, with the same fallback
//! - `stop_browse()` is called when the window closes so the daemon does not
//!   accumulate work between windows

use std::collections::HashMap;

use mdns_sd::{ResolvedService, ServiceDaemon, ServiceEvent};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::sink::DiscoverySink;
use super::traits::DiscoveryBackend;
use super::types::{BackendError, BackendResult, Device};
use crate::protocol_constants::{CAST_SERVICE_TYPE, CAST_TXT_FRIENDLY_NAME, CAST_TXT_ID};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Discovery collaborator backed by a shared mDNS daemon.
pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
    spawner: TokioSpawner,
    browse_token: Mutex<Option<CancellationToken>>,
}

impl MdnsDiscovery {
    /// Creates the daemon. The daemon runs its own background thread.
    pub fn new(spawner: TokioSpawner) -> BackendResult<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| BackendError::Unavailable(e.to_string()))?;
        Ok(Self {
            daemon,
            spawner,
            browse_token: Mutex::new(None),
        })
    }
}

impl DiscoveryBackend for MdnsDiscovery {
    fn start_discovery(&self, sink: DiscoverySink) -> BackendResult<()> {
        let receiver = self
            .daemon
            .browse(CAST_SERVICE_TYPE)
            .map_err(|e| BackendError::Failed(e.to_string()))?;

        let token = CancellationToken::new();
        if let Some(previous) = self.browse_token.lock().replace(token.clone()) {
            previous.cancel();
        }

        log::debug!(
            "[mDNS] Browsing {} for window {}",
            CAST_SERVICE_TYPE,
            sink.window_id()
        );

        self.spawner.spawn(async move {
            // fullname -> device id, so removals can be reported by id
            let mut seen: HashMap<String, String> = HashMap::new();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = receiver.recv_async() => match event {
                        Ok(ServiceEvent::ServiceResolved(info)) => {
                            log::trace!("[mDNS] Service resolved: {:?}", info.get_fullname());
                            if let Some(device) = parse_cast_service(&info) {
                                seen.insert(info.get_fullname().to_string(), device.id.clone());
                                if !sink.device_added(device) {
                                    break;
                                }
                            }
                        }
                        Ok(ServiceEvent::ServiceRemoved(_, fullname)) => {
                            if let Some(id) = seen.remove(&fullname) {
                                if !sink.device_removed(id) {
                                    break;
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log::debug!("[mDNS] Receiver channel closed: {:?}", e);
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    fn stop_discovery(&self) {
        if let Some(token) = self.browse_token.lock().take() {
            token.cancel();
            if let Err(e) = self.daemon.stop_browse(CAST_SERVICE_TYPE) {
                log::warn!("[mDNS] Failed to stop browse: {:?}", e);
            }
        }
    }
}

fn parse_cast_service(info: &ResolvedService) -> Option<Device> {
    device_from_record(
        info.get_fullname(),
        info.get_property_val_str(CAST_TXT_ID),
        info.get_property_val_str(CAST_TXT_FRIENDLY_NAME),
    )
}

/// Builds a device from the service instance name and its TXT values.
fn device_from_record(
    fullname: &str,
    txt_id: Option<&str>,
    txt_name: Option<&str>,
) -> Option<Device> {
    let instance = instance_name(fullname);
    let pick = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let id = pick(txt_id).or_else(|| pick(Some(instance.as_str())))?;
    let name = pick(txt_name).unwrap_or_else(|| instance.clone());
    Some(Device::new(id, name))
}

fn instance_name(fullname: &str) -> String {
    let suffix = format!(".{}", CAST_SERVICE_TYPE);
    fullname
        .trim()
        .strip_suffix(suffix.as_str())
        .unwrap_or(fullname)
        .trim_matches('.')
        .to_string()
}
