//! Device error definitions.
//!
//! This module defines the error taxonomy for the peripheral. It separates:
//! 1. **Bring-up failures:** Script loading and initialization-contract errors,
//!    which abort device construction.
//! 2. **Steady-state failures:** Call failures and contract violations during
//!    normal operation, recovered locally with a diagnostic and a neutral value.
//! 3. **Guest errors:** Accesses to unmapped register offsets, reported but
//!    never fatal.

use thiserror::Error;

/// Errors raised by the co-simulated RTC peripheral.
///
/// Only `ScriptLoadFailed` and contract violations from the initialization
/// entry point abort bring-up; every other variant is logged at the point of
/// recovery and the guest-visible access completes with a safe default.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The model script could not be read, parsed, or executed, or its
    /// initialization entry point reported a negative status.
    #[error("script program load failed: {reason}")]
    ScriptLoadFailed {
        /// Human-readable cause (I/O error, interpreter error, init status).
        reason: String,
    },

    /// A script entry point broke the typed call contract: missing function,
    /// wrong result arity, or a non-integer result slot.
    #[error("script contract violation in `{entry}`: {reason}")]
    ScriptContractViolation {
        /// Name of the offending entry point or module attribute.
        entry: String,
        /// What the contract expected and what was found.
        reason: String,
    },

    /// A script call raised a runtime error, or the model reported a negative
    /// status code.
    #[error("script call `{entry}` failed: {reason}")]
    ScriptCallFailed {
        /// Name of the entry point that failed.
        entry: String,
        /// Interpreter error text or the reported status code.
        reason: String,
    },

    /// A guest access targeted an offset outside the register map.
    #[error("bad register offset {offset:#x}")]
    BadRegisterOffset {
        /// The faulting device-relative offset.
        offset: u64,
    },
}

impl DeviceError {
    /// Builds a `ScriptLoadFailed` from any displayable cause.
    pub(crate) fn load_failed(reason: impl Into<String>) -> Self {
        Self::ScriptLoadFailed {
            reason: reason.into(),
        }
    }

    /// Builds a `ScriptContractViolation` for the given entry point.
    pub(crate) fn contract(entry: &str, reason: impl Into<String>) -> Self {
        Self::ScriptContractViolation {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a `ScriptCallFailed` for the given entry point.
    pub(crate) fn call_failed(entry: &str, reason: impl Into<String>) -> Self {
        Self::ScriptCallFailed {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }
}
