//! Memory-Mapped IO Devices.
//!
//! This module contains the bus-attached device implementations: the
//! co-simulated scriptable RTC and the time-step synchronizer that drives
//! its model script.

/// Co-simulated scriptable RTC device.
pub mod scripted_rtc;

/// Time-step synchronizer for the co-simulation bridge.
pub mod step_sync;

pub use scripted_rtc::ScriptedRtc;
pub use step_sync::{StepSynchronizer, SyncState};

pub use crate::soc::traits::Device;
