//! Scriptable mock of the co-simulation model.

use std::sync::{Arc, Mutex};

use cosim_core::bridge::{CallStatus, CosimModel};
use cosim_core::common::DeviceError;

/// Shared state behind a [`MockModel`].
///
/// Tests set the status each entry point should report (using the raw wire
/// convention: 0 ok, 1 ok-plus-interrupt, negative failure) and inspect the
/// recorded calls afterwards.
#[derive(Debug, Default)]
pub struct ModelState {
    /// Status reported by `step`.
    pub step_status: i64,
    /// Status reported by `read_data`.
    pub read_status: i64,
    /// Data value returned by `read_data`.
    pub read_value: u32,
    /// Status reported by `write_data`.
    pub write_status: i64,

    /// Timestamps of every `step` call.
    pub step_calls: Vec<u64>,
    /// `(now_ns, addr)` of every `read_data` call.
    pub read_calls: Vec<(u64, u64)>,
    /// `(now_ns, addr, value)` of every `write_data` call.
    pub write_calls: Vec<(u64, u64, u32)>,
}

/// Mock co-simulation model with externally scripted outcomes.
pub struct MockModel {
    state: Arc<Mutex<ModelState>>,
}

impl MockModel {
    /// Creates the mock and the shared state handle.
    pub fn new() -> (Self, Arc<Mutex<ModelState>>) {
        let state = Arc::new(Mutex::new(ModelState::default()));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl CosimModel for MockModel {
    fn step(&mut self, now_ns: u64) -> Result<CallStatus, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.step_calls.push(now_ns);
        CallStatus::from_raw("coroutine_yield", state.step_status)
    }

    fn read_data(&mut self, now_ns: u64, addr: u64) -> Result<(CallStatus, u32), DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.read_calls.push((now_ns, addr));
        let status = CallStatus::from_raw("read_data", state.read_status)?;
        Ok((status, state.read_value))
    }

    fn write_data(
        &mut self,
        now_ns: u64,
        addr: u64,
        value: u32,
    ) -> Result<CallStatus, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.write_calls.push((now_ns, addr, value));
        CallStatus::from_raw("write_data", state.write_status)
    }
}
