//! Configuration system for the co-simulated RTC peripheral.
//!
//! This module defines the configuration structures used to parameterize the
//! system. It provides:
//! 1. **Defaults:** Baseline constants (device base address, script path).
//! 2. **Structures:** Hierarchical config for the memory map, the model
//!    script, and the RTC's snapshot behavior.
//!
//! Configuration is supplied as JSON (see [`Config::from_json`]) or via
//! `Config::default()`.

use serde::Deserialize;

/// Default configuration constants.
///
/// These values define the baseline configuration when not explicitly
/// overridden.
mod defaults {
    /// Base address of the co-simulated RTC MMIO region.
    pub const DEVICE_BASE: u64 = 0x0010_1000;

    /// Model script loaded at device bring-up, relative to the working
    /// directory.
    pub const SCRIPT_PATH: &str = "rtc_model.py";
}

/// Root configuration; use `Config::default()` or deserialize from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Memory map configuration.
    pub system: SystemConfig,
    /// Model script configuration.
    pub script: ScriptConfig,
    /// RTC snapshot behavior.
    pub rtc: RtcConfig,
}

impl Config {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Any `serde_json` parse or schema error.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// System memory map configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// RTC MMIO base address.
    #[serde(default = "SystemConfig::default_device_base")]
    pub device_base: u64,
}

impl SystemConfig {
    /// Returns the default RTC MMIO base address.
    fn default_device_base() -> u64 {
        defaults::DEVICE_BASE
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            device_base: defaults::DEVICE_BASE,
        }
    }
}

/// Model script configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Path of the model script loaded at bring-up.
    #[serde(default = "ScriptConfig::default_path")]
    pub path: String,
}

impl ScriptConfig {
    /// Returns the default model script path.
    fn default_path() -> String {
        defaults::SCRIPT_PATH.to_string()
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: defaults::SCRIPT_PATH.to_string(),
        }
    }
}

/// RTC snapshot behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct RtcConfig {
    /// True to persist the exact tick offset of the RTC. False to remain
    /// compatible with receivers that predate the raw-offset field, at the
    /// expense of the guest RTC drifting backward relative to the host RTC
    /// across a save/restore. (Even when true, snapshots from older encoders
    /// still restore; false also lets newer snapshots restore on older
    /// decoders.)
    #[serde(default = "RtcConfig::default_migrate_tick_offset")]
    pub migrate_tick_offset: bool,
}

impl RtcConfig {
    /// Offset migration is on unless explicitly disabled.
    fn default_migrate_tick_offset() -> bool {
        true
    }
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            migrate_tick_offset: true,
        }
    }
}
