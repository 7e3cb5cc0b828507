//! Bridge to the co-simulated model script.
//!
//! This module defines the typed call contract between the peripheral and its
//! externally loaded simulation counterpart:
//! 1. **Outcome tagging:** Every data-producing call leads with a status code;
//!    [`CallStatus`] makes the success/interrupt-request distinction explicit
//!    at each call site instead of comparing raw integers.
//! 2. **Model contract:** The [`CosimModel`] trait names one method per script
//!    entry point, with integer-typed arguments and results.
//! 3. **Engine binding:** The [`python::ScriptBridge`] implementation embeds
//!    CPython and validates arity and result types on every round trip.

use crate::common::DeviceError;

/// Embedded-Python implementation of the model contract.
pub mod python;

pub use python::ScriptBridge;

/// Tagged outcome of a successful bridge call.
///
/// The model reports `0` for plain success and `1` for success plus an
/// interrupt request. Negative codes are failures and surface as
/// [`DeviceError::ScriptCallFailed`]; anything else is outside the contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallStatus {
    /// The call succeeded with no side-effect request.
    Ok,
    /// The call succeeded and the model requests an interrupt pulse.
    OkRequestInterrupt,
}

impl CallStatus {
    /// Maps a raw status slot to a tagged outcome.
    ///
    /// # Errors
    ///
    /// Negative codes become `ScriptCallFailed`; unknown positive codes become
    /// `ScriptContractViolation`.
    pub fn from_raw(entry: &str, raw: i64) -> Result<Self, DeviceError> {
        match raw {
            0 => Ok(Self::Ok),
            1 => Ok(Self::OkRequestInterrupt),
            n if n < 0 => Err(DeviceError::call_failed(
                entry,
                format!("model reported status {n}"),
            )),
            n => Err(DeviceError::contract(
                entry,
                format!("unknown status code {n}"),
            )),
        }
    }

    /// Returns whether the model asked for an interrupt pulse.
    pub fn wants_interrupt(self) -> bool {
        matches!(self, Self::OkRequestInterrupt)
    }
}

/// Entry points the co-simulated model must provide.
///
/// One method per named script function. Implementations perform a fresh
/// round trip per call, validate every result slot before returning, and
/// must never be reentered (the script cannot call back into the device).
pub trait CosimModel: Send + Sync {
    /// Advances the model by one time step (`coroutine_yield`).
    ///
    /// # Errors
    ///
    /// Call or contract failures from the script engine.
    fn step(&mut self, now_ns: u64) -> Result<CallStatus, DeviceError>;

    /// Reads one data word from the model (`read_data`).
    ///
    /// # Errors
    ///
    /// Call or contract failures from the script engine; no partial results
    /// are returned on a failed validation.
    fn read_data(&mut self, now_ns: u64, addr: u64) -> Result<(CallStatus, u32), DeviceError>;

    /// Writes one data word into the model (`write_data`).
    ///
    /// # Errors
    ///
    /// Call or contract failures from the script engine.
    fn write_data(&mut self, now_ns: u64, addr: u64, value: u32)
    -> Result<CallStatus, DeviceError>;
}
