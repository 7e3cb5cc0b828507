//! Time-step synchronizer for the co-simulation bridge.
//!
//! Periodically drives the model's time-advance entry point against the
//! virtual clock. The synchronizer is a two-state machine (*armed* and
//! *firing*): when the deadline is reached it fires the bridge call, applies
//! any interrupt request, then reschedules itself one step interval past the
//! firing instant.
//!
//! Failures are fail-open: a bad step is logged and the next step is still
//! scheduled, so the co-simulation keeps running. Consecutive contract
//! violations are counted and escalated to the operator once they repeat.

use tracing::{error, warn};

use crate::bridge::CosimModel;
use crate::common::DeviceError;
use crate::irq::InterruptLine;

/// Consecutive contract violations tolerated before escalating.
const VIOLATION_ESCALATION_THRESHOLD: u32 = 3;

/// Synchronizer state; `Firing` only while the bridge call is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for the next deadline.
    Armed,
    /// Executing the time-step bridge call.
    Firing,
}

/// Periodically rearmed driver of the model's `coroutine_yield` entry point.
///
/// Independent of the RTC alarm timer; the two may expire at the same poll
/// without interfering.
pub struct StepSynchronizer {
    state: SyncState,
    step_ns: u64,
    deadline_ns: u64,
    violation_streak: u32,
}

impl StepSynchronizer {
    /// Creates a synchronizer with its first deadline one interval from now.
    ///
    /// # Arguments
    ///
    /// * `step_ns` - Step interval in virtual nanoseconds (script-configured).
    /// * `now_ns` - Current virtual time.
    pub fn new(step_ns: u64, now_ns: u64) -> Self {
        Self {
            state: SyncState::Armed,
            step_ns,
            deadline_ns: now_ns.wrapping_add(step_ns),
            violation_streak: 0,
        }
    }

    /// Step interval in virtual nanoseconds.
    pub fn step_interval_ns(&self) -> u64 {
        self.step_ns
    }

    /// Current state (always `Armed` between polls).
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Returns whether the deadline has been reached.
    pub fn due(&self, now_ns: u64) -> bool {
        self.state == SyncState::Armed && now_ns >= self.deadline_ns
    }

    /// Moves the deadline one interval past `now_ns` without firing.
    ///
    /// Used after a snapshot restore, where the pre-restore deadline is
    /// meaningless.
    pub fn reschedule(&mut self, now_ns: u64) {
        self.deadline_ns = now_ns.wrapping_add(self.step_ns);
    }

    /// Fires one time step: calls the model, applies the outcome, reschedules.
    ///
    /// A call failure or contract violation is logged and the synchronizer
    /// still rearms; the guest never observes the fault.
    pub fn run(&mut self, now_ns: u64, model: &mut dyn CosimModel, line: &mut InterruptLine) {
        self.state = SyncState::Firing;

        match model.step(now_ns) {
            Ok(status) => {
                self.violation_streak = 0;
                if status.wants_interrupt() {
                    line.pulse();
                }
            }
            Err(e @ DeviceError::ScriptContractViolation { .. }) => {
                self.violation_streak += 1;
                warn!(target: "script", "time step at {now_ns} ns: {e}");
                if self.violation_streak >= VIOLATION_ESCALATION_THRESHOLD {
                    error!(
                        target: "script",
                        "model has violated the time-step contract {} times in a row",
                        self.violation_streak
                    );
                }
            }
            Err(e) => {
                warn!(target: "script", "time step at {now_ns} ns: {e}");
            }
        }

        self.deadline_ns = now_ns.wrapping_add(self.step_ns);
        self.state = SyncState::Armed;
    }
}
