//! System interconnect (bus) for MMIO access.
//!
//! This module implements the bus that routes physical address accesses to
//! devices. It provides:
//! 1. **Device registration:** Devices are added by address range and sorted
//!    for lookup.
//! 2. **Access routing:** Read/write by address with a last-device hint.
//! 3. **Polling:** Each device's timers are serviced in registration order.
//! 4. **Unclaimed addresses:** Logged as a guest diagnostic; reads return 0
//!    and writes are dropped, never faulting the access.

use tracing::warn;

use super::traits::Device;

/// System bus connecting the guest to MMIO devices; routes by physical address.
///
/// Holds a sorted list of devices and an index hint for repeated accesses to
/// the same device.
pub struct Bus {
    /// Registered MMIO devices (boxed for dynamic dispatch).
    devices: Vec<Box<dyn Device>>,
    last_device_idx: usize,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Creates an empty bus; add devices with `add_device`.
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            last_device_idx: 0,
        }
    }

    /// Registers a device on the bus; devices are sorted by base address.
    ///
    /// # Arguments
    ///
    /// * `dev` - The device to add (must implement `Device`).
    pub fn add_device(&mut self, dev: Box<dyn Device>) {
        self.devices.push(dev);
        self.devices.sort_by_key(|d| d.address_range().0);
        self.last_device_idx = 0;
    }

    /// Returns whether the given physical address is claimed by any device.
    pub fn is_valid_address(&self, paddr: u64) -> bool {
        self.devices.iter().any(|dev| {
            let (start, size) = dev.address_range();
            paddr >= start && paddr < start + size
        })
    }

    /// Services every device's timers once, in registration order.
    ///
    /// The host event loop calls this between guest accesses; devices never
    /// observe concurrent polling.
    pub fn poll(&mut self) {
        for dev in &mut self.devices {
            dev.poll();
        }
    }

    /// Returns a mutable reference to the named device, if registered.
    pub fn device_by_name_mut(&mut self, name: &str) -> Option<&mut Box<dyn Device>> {
        self.devices.iter_mut().find(|d| d.name() == name)
    }

    fn find_device(&mut self, paddr: u64) -> Option<(&mut Box<dyn Device>, u64)> {
        if self.last_device_idx < self.devices.len() {
            let (start, size) = self.devices[self.last_device_idx].address_range();
            if paddr >= start && paddr < start + size {
                return Some((&mut self.devices[self.last_device_idx], paddr - start));
            }
        }

        for (i, dev) in self.devices.iter_mut().enumerate() {
            let (start, size) = dev.address_range();
            if paddr >= start && paddr < start + size {
                self.last_device_idx = i;
                return Some((dev, paddr - start));
            }
        }
        None
    }

    /// Reads four bytes at the given physical address; logs and returns 0 if
    /// no device claims the address.
    pub fn read_u32(&mut self, paddr: u64) -> u32 {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.read_u32(offset)
        } else {
            warn!(target: "guest", "read of unclaimed address {paddr:#x}");
            0
        }
    }

    /// Writes four bytes at the given physical address; logs and drops the
    /// write if no device claims the address.
    pub fn write_u32(&mut self, paddr: u64, val: u32) {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.write_u32(offset, val);
        } else {
            warn!(target: "guest", "write of unclaimed address {paddr:#x}");
        }
    }

    /// Reads one byte at the given physical address; 0 if unclaimed.
    pub fn read_u8(&mut self, paddr: u64) -> u8 {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.read_u8(offset)
        } else {
            0
        }
    }

    /// Reads eight bytes at the given physical address; 0 if unclaimed.
    pub fn read_u64(&mut self, paddr: u64) -> u64 {
        if let Some((dev, offset)) = self.find_device(paddr) {
            dev.read_u64(offset)
        } else {
            0
        }
    }
}
