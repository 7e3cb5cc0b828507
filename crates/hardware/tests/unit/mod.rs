//! Unit tests for the device components.

/// Bridge tests against the embedded Python engine.
pub mod bridge_tests;

/// SoC-level tests (bus, devices).
pub mod soc;
