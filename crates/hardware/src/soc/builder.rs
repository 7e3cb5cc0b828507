//! System construction and top-level `System` type.
//!
//! This module builds the complete system from configuration. It performs:
//! 1. **Bridge bring-up:** Loads and initializes the model script; a load or
//!    initialization-contract failure aborts construction.
//! 2. **Device registration:** Creates the co-simulated RTC on the bus at the
//!    configured base address.
//! 3. **Snapshot access:** Exposes the device's save/restore hooks.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bridge::ScriptBridge;
use crate::common::DeviceError;
use crate::config::Config;
use crate::irq::TraceIrqSink;
use crate::snapshot::DeviceSnapshot;
use crate::soc::devices::ScriptedRtc;
use crate::soc::devices::scripted_rtc;
use crate::soc::interconnect::Bus;
use crate::soc::traits::Device;
use crate::time::ManualClock;

/// Top-level system instance containing the bus and its devices.
///
/// Holds the interconnect (`Bus`); the clock handle passed at construction
/// stays with the caller, which advances time and calls [`poll`](Self::poll).
pub struct System {
    /// System interconnect; routes accesses to MMIO devices.
    pub bus: Bus,
}

impl System {
    /// Builds a new system from configuration.
    ///
    /// Loads the model script, validates its initialization contract, and
    /// registers the RTC device. The caller keeps a clone of `clock` to
    /// advance simulated time.
    ///
    /// # Arguments
    ///
    /// * `config` - System configuration (device base, script path, snapshot mode).
    /// * `clock` - Shared clock handle; clones observe the same time.
    ///
    /// # Errors
    ///
    /// Any bring-up failure from the script bridge; the device is not
    /// registered in that case.
    pub fn new(config: &Config, clock: ManualClock) -> Result<Self, DeviceError> {
        let (bridge, step_interval_ns) = ScriptBridge::load(Path::new(&config.script.path))?;

        let boot_wall_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        let rtc = ScriptedRtc::new(
            config.system.device_base,
            clock,
            bridge,
            step_interval_ns,
            Box::new(TraceIrqSink::new()),
            config.rtc.migrate_tick_offset,
            boot_wall_secs,
        );

        let mut bus = Bus::new();
        bus.add_device(Box::new(rtc));

        Ok(Self { bus })
    }

    /// Services every device's timers once.
    pub fn poll(&mut self) {
        self.bus.poll();
    }

    /// Returns the RTC's snapshot interface.
    pub fn rtc_snapshot_mut(&mut self) -> Option<&mut dyn DeviceSnapshot> {
        self.bus
            .device_by_name_mut(scripted_rtc::DEVICE_NAME)?
            .as_snapshot_mut()
    }
}
