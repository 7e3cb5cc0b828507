//! Common types shared across the device model.
//!
//! This module collects the pieces every other module needs. It includes:
//! 1. **Error Handling:** The device error taxonomy separating bring-up
//!    failures from recoverable steady-state faults.

/// Error types for script loading, bridge calls, and guest accesses.
pub mod error;

pub use error::DeviceError;
