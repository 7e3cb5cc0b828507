//! Interrupt line plumbing.
//!
//! This module maps interrupt conditions to an output line level. It provides:
//! 1. **Sink contract:** The `IrqSink` collaborator trait implemented by the
//!    host interrupt controller (or a recording mock in tests).
//! 2. **Relay:** `InterruptLine`, which deduplicates level pushes so repeated
//!    updates with an unchanged level have no additional effect.
//! 3. **Pulses:** Script-requested interrupt assertions, forwarded once per
//!    request regardless of the current level.

use tracing::trace;

/// Output interrupt line consumed by the host interrupt controller.
pub trait IrqSink: Send + Sync {
    /// Drives the line to the given level.
    fn set_level(&mut self, active: bool);
}

/// Level-tracking relay in front of an [`IrqSink`].
///
/// RTC-sourced updates go through [`set_level`](Self::set_level), which is
/// idempotent. Script-requested interrupts go through [`pulse`](Self::pulse),
/// which always forwards an assertion so each request is visible to the sink.
pub struct InterruptLine {
    sink: Box<dyn IrqSink>,
    level: bool,
}

impl InterruptLine {
    /// Wraps a sink; the line starts deasserted.
    pub fn new(sink: Box<dyn IrqSink>) -> Self {
        Self { sink, level: false }
    }

    /// Drives the line to `active`, forwarding only on a level change.
    pub fn set_level(&mut self, active: bool) {
        if active != self.level {
            trace!(target: "irq", "line level {} -> {}", self.level, active);
            self.level = active;
            self.sink.set_level(active);
        }
    }

    /// Asserts the line on behalf of the model script.
    ///
    /// Forwarded unconditionally, one assertion per call; the next RTC-sourced
    /// update re-drives the line from the status and mask registers.
    pub fn pulse(&mut self) {
        trace!(target: "irq", "script-requested interrupt");
        self.level = true;
        self.sink.set_level(true);
    }

    /// Current line level.
    pub fn level(&self) -> bool {
        self.level
    }
}

/// Sink that reports line transitions through the diagnostic log.
///
/// Used by the CLI runner, where no interrupt controller is attached.
#[derive(Debug, Default)]
pub struct TraceIrqSink;

impl TraceIrqSink {
    /// Creates the sink.
    pub fn new() -> Self {
        Self
    }
}

impl IrqSink for TraceIrqSink {
    fn set_level(&mut self, active: bool) {
        trace!(target: "irq", "irq line driven {}", if active { "high" } else { "low" });
    }
}
