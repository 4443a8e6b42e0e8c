//! Deduplicated device set for one discovery window.

use crate::backend::Device;

/// Devices seen during the current window, in first-seen order.
///
/// At most one entry exists per device id. Re-announcing a known id keeps
/// the original entry and position.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `device` unless its id is already present.
    ///
    /// Returns `true` when the device was new.
    pub fn on_device_added(&mut self, device: Device) -> bool {
        if self.contains(&device.id) {
            return false;
        }
        self.devices.push(device);
        true
    }

    /// Removes the device with `device_id`. Returns `true` if it was present.
    pub fn on_device_removed(&mut self, device_id: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != device_id);
        self.devices.len() != before
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d.id == device_id)
    }

    /// Copy of the current set in first-seen order.
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices.clone()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> Device {
        Device::new(id, format!("Device {}", id))
    }

    #[test]
    fn duplicate_announcements_collapse() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.on_device_added(device("A")));
        assert!(registry.on_device_added(device("B")));
        assert!(!registry.on_device_added(Device::new("A", "Renamed")));

        let ids: Vec<_> = registry.snapshot().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(registry.snapshot()[0].name, "Device A");
    }

    #[test]
    fn removal_of_unknown_id_is_a_noop() {
        let mut registry = DeviceRegistry::new();
        registry.on_device_added(device("A"));
        assert!(!registry.on_device_removed("Z"));
        assert!(registry.on_device_removed("A"));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn readded_device_moves_to_the_end() {
        let mut registry = DeviceRegistry::new();
        registry.on_device_added(device("A"));
        registry.on_device_added(device("B"));
        registry.on_device_removed("A");
        registry.on_device_added(device("A"));

        let ids: Vec<_> = registry.snapshot().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    /// Replays a long pseudo-random add/remove sequence against a simple
    /// model of the last event per id.
    #[test]
    fn snapshot_matches_last_event_per_id() {
        let mut registry = DeviceRegistry::new();
        let mut present = [false; 8];
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let id = (seed % 8) as usize;
            let name = format!("d{}", id);

            if seed & 0x100 == 0 {
                registry.on_device_added(device(&name));
                present[id] = true;
            } else {
                registry.on_device_removed(&name);
                present[id] = false;
            }

            let snapshot = registry.snapshot();
            let expected = present.iter().filter(|p| **p).count();
            assert_eq!(snapshot.len(), expected);
            for (i, is_present) in present.iter().enumerate() {
                assert_eq!(registry.contains(&format!("d{}", i)), *is_present);
            }
        }
    }
}
