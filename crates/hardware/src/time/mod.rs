//! Clocks and timer primitives.
//!
//! This module defines the two time sources the peripheral consumes and the
//! deadline primitive its timers are built on:
//! 1. **Virtual clock:** Nanosecond-resolution monotonic time driving the
//!    time-step synchronizer; independent of wall-clock semantics.
//! 2. **Reference clock:** Second-resolution wall-clock-like time used for
//!    guest-visible RTC counting.
//! 3. **Timers:** A one-shot rearmable deadline checked by polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds per second, for virtual-to-reference conversions.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Paired time sources consumed by the peripheral.
///
/// Both sources are monotonic. They are deliberately distinct: the reference
/// clock approximates host wall-clock seconds and feeds the guest-visible
/// counter, while the virtual clock drives scheduling and is handed to the
/// model script on every bridge call.
pub trait Clock: Send + Sync {
    /// Current virtual time in nanoseconds.
    fn virtual_now_ns(&self) -> u64;

    /// Current reference (wall-clock-like) time in whole seconds.
    fn reference_now_secs(&self) -> u64;

    /// Current virtual time in whole seconds.
    fn virtual_now_secs(&self) -> u64 {
        self.virtual_now_ns() / NANOS_PER_SEC
    }
}

/// Manually advanced clock with shared handles.
///
/// Clones share the same counters, so a test (or the CLI run loop) can keep a
/// handle and advance time while the device holds another. The two sources
/// advance independently; `advance` moves them in lockstep for wall-clock-like
/// runs.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    virtual_ns: Arc<AtomicU64>,
    reference_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock with both sources at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock whose reference source starts at the host's current
    /// wall-clock time (seconds since the Unix epoch).
    pub fn seeded_from_host() -> Self {
        let clock = Self::new();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        clock.set_reference_secs(now);
        clock
    }

    /// Advances only the virtual source by `ns` nanoseconds.
    pub fn advance_virtual_ns(&self, ns: u64) {
        let _ = self.virtual_ns.fetch_add(ns, Ordering::Relaxed);
    }

    /// Advances only the reference source by `secs` seconds.
    pub fn advance_reference_secs(&self, secs: u64) {
        let _ = self
            .reference_ns
            .fetch_add(secs * NANOS_PER_SEC, Ordering::Relaxed);
    }

    /// Advances both sources by `ns` nanoseconds in lockstep.
    pub fn advance(&self, ns: u64) {
        let _ = self.virtual_ns.fetch_add(ns, Ordering::Relaxed);
        let _ = self.reference_ns.fetch_add(ns, Ordering::Relaxed);
    }

    /// Sets the reference source to an absolute number of seconds.
    pub fn set_reference_secs(&self, secs: u64) {
        self.reference_ns
            .store(secs * NANOS_PER_SEC, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn virtual_now_ns(&self) -> u64 {
        self.virtual_ns.load(Ordering::Relaxed)
    }

    fn reference_now_secs(&self) -> u64 {
        self.reference_ns.load(Ordering::Relaxed) / NANOS_PER_SEC
    }
}

/// One-shot rearmable deadline.
///
/// Unlike a callback timer, expiry is observed by polling: the owner calls
/// `take_expired` with the current time and reacts when it returns `true`.
/// Re-arming replaces any previous deadline; an expired timer stays disarmed
/// until armed again.
#[derive(Clone, Copy, Debug, Default)]
pub struct OneShotTimer {
    deadline: Option<u64>,
}

impl OneShotTimer {
    /// Arms the timer to expire at the given absolute time.
    pub fn arm(&mut self, deadline: u64) {
        self.deadline = Some(deadline);
    }

    /// Disarms the timer without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Returns whether a deadline is currently pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns the pending deadline, if any.
    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Consumes an expired deadline.
    ///
    /// Returns `true` exactly once per armed deadline, the first time `now`
    /// reaches it; the timer is disarmed as a side effect.
    pub fn take_expired(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
