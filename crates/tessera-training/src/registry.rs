//! DeviceRegistry - Device to Slot Mapping
//!
//! Devices are registered in a fixed order; a device's position is its slot
//! index, used to index every replica list of the store.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::collections::HashMap;

use tessera_core::{Device, Error, Result};

// =============================================================================
// DeviceRegistry
// =============================================================================

/// Ordered set of devices with contiguous slot indices starting at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    slots: HashMap<Device, usize>,
}

impl DeviceRegistry {
    /// Registry holding exactly one device at slot 0.
    pub fn single(device: Device) -> Self {
        Self {
            devices: vec![device],
            slots: HashMap::from([(device, 0)]),
        }
    }

    /// Registry with `devices` in order. The list must be non-empty and
    /// free of duplicates.
    pub fn from_devices(devices: &[Device]) -> Result<Self> {
        if devices.is_empty() {
            return Err(Error::invalid_configuration(
                "at least one device must be registered",
            ));
        }

        let mut slots = HashMap::with_capacity(devices.len());
        for (slot, &device) in devices.iter().enumerate() {
            if slots.insert(device, slot).is_some() {
                return Err(Error::invalid_configuration(format!(
                    "device {device} is registered more than once"
                )));
            }
        }

        Ok(Self {
            devices: devices.to_vec(),
            slots,
        })
    }

    /// Returns the slot of `device`.
    pub fn slot_of(&self, device: Device) -> Result<usize> {
        self.slots
            .get(&device)
            .copied()
            .ok_or(Error::UnknownDevice { device })
    }

    /// Returns the device registered at `slot`.
    pub fn device_at(&self, slot: usize) -> Option<Device> {
        self.devices.get(slot).copied()
    }

    /// Returns true if `device` is registered.
    pub fn contains(&self, device: Device) -> bool {
        self.slots.contains_key(&device)
    }

    /// Returns the devices in slot order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Always false; a registry holds at least one device.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_device() {
        let registry = DeviceRegistry::single(Device::Gpu(3));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.slot_of(Device::Gpu(3)).unwrap(), 0);
        assert_eq!(
            registry.slot_of(Device::Cpu),
            Err(Error::UnknownDevice {
                device: Device::Cpu
            })
        );
    }

    #[test]
    fn test_slots_follow_order() {
        let devices = [Device::Gpu(1), Device::Cpu, Device::Gpu(0)];
        let registry = DeviceRegistry::from_devices(&devices).unwrap();
        assert_eq!(registry.slot_of(Device::Gpu(1)).unwrap(), 0);
        assert_eq!(registry.slot_of(Device::Cpu).unwrap(), 1);
        assert_eq!(registry.slot_of(Device::Gpu(0)).unwrap(), 2);
        assert_eq!(registry.device_at(2), Some(Device::Gpu(0)));
        assert_eq!(registry.device_at(3), None);
        assert_eq!(registry.devices(), &devices);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(DeviceRegistry::from_devices(&[]).is_err());
        let err = DeviceRegistry::from_devices(&[Device::Gpu(0), Device::Gpu(0)]).unwrap_err();
        assert!(err.is_configuration());
    }
}
