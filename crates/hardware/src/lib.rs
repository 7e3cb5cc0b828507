//! Co-simulated scriptable RTC peripheral library.
//!
//! This crate models a memory-mapped RTC peripheral that stays bit-compatible
//! with the PL031 register layout while delegating one exchange register to
//! an externally loaded model script. It provides:
//! 1. **Bridge:** Typed call contract to the embedded script engine, with
//!    strict arity and result-type validation.
//! 2. **Device:** Register dispatch, the RTC state machine, alarm handling,
//!    and the time-step synchronizer.
//! 3. **Time:** Virtual and reference clock sources and a one-shot timer.
//! 4. **Interrupts:** Level relay with idempotent pushes and script pulses.
//! 5. **Snapshot:** Tag-length-value persisted state with the asymmetric
//!    tick-offset migration rule.
//! 6. **SoC:** Bus interconnect and system assembly from configuration.

/// Bridge to the co-simulated model script (contract and pyo3 binding).
pub mod bridge;
/// Common types (device error taxonomy).
pub mod common;
/// Configuration (defaults, hierarchical structures, JSON loading).
pub mod config;
/// Interrupt line plumbing.
pub mod irq;
/// Persisted device state (TLV codec, snapshot contract).
pub mod snapshot;
/// System-on-chip (bus, devices, builder, traits).
pub mod soc;
/// Clocks and timer primitives.
pub mod time;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Top-level system (bus and devices); construct with `System::new`.
pub use crate::soc::System;
