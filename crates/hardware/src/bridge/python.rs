//! Embedded-Python script engine binding.
//!
//! Loads the model program once at bring-up, resolves its configuration, and
//! performs typed round trips for every entry point. All validation happens
//! before any value is handed back: a wrong arity or a non-integer result
//! slot yields an error, never a stale or partial result.
//!
//! # Script contract
//!
//! * `init()`: called once with no arguments, returns one integer status;
//!   negative aborts bring-up.
//! * `nanoseconds_per_step`: module-level positive integer, the cadence of
//!   the time-step synchronizer.
//! * `coroutine_yield(time_ns)`: returns one status integer.
//! * `read_data(time_ns, addr)`: returns `(status, data)`.
//! * `write_data(time_ns, addr, value)`: returns one status integer.

use std::ffi::CString;
use std::fs;
use std::path::Path;

use pyo3::prelude::*;
use pyo3::types::{PyInt, PyModule, PyTuple};

use crate::bridge::{CallStatus, CosimModel};
use crate::common::DeviceError;

/// Initialization entry point, invoked once at load.
const ENTRY_INIT: &str = "init";
/// Time-step entry point, invoked by the synchronizer.
const ENTRY_STEP: &str = "coroutine_yield";
/// Exchange-register read entry point.
const ENTRY_READ: &str = "read_data";
/// Exchange-register write entry point.
const ENTRY_WRITE: &str = "write_data";
/// Module-level attribute holding the step interval in nanoseconds.
const ATTR_STEP_INTERVAL: &str = "nanoseconds_per_step";

/// Owned handle to one loaded model script.
///
/// Exactly one bridge exists per device instance; dropping it releases the
/// module reference. The embedded interpreter itself is process-wide and
/// initialized on first use.
#[derive(Debug)]
pub struct ScriptBridge {
    module: Py<PyModule>,
}

impl ScriptBridge {
    /// Loads and initializes the model program at `path`.
    ///
    /// Executes the program, invokes `init()` expecting exactly one integer
    /// status, and reads the `nanoseconds_per_step` attribute. Returns the
    /// bridge together with the validated step interval.
    ///
    /// # Errors
    ///
    /// `ScriptLoadFailed` if the file cannot be read or executed or `init`
    /// reports a negative status; `ScriptContractViolation` if an entry point
    /// or the step-interval attribute is missing, non-integral, or not
    /// positive.
    pub fn load(path: &Path) -> Result<(Self, u64), DeviceError> {
        let source = fs::read_to_string(path)
            .map_err(|e| DeviceError::load_failed(format!("{}: {e}", path.display())))?;
        let module_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("cosim_model");

        Python::with_gil(|py| {
            let code = CString::new(source)
                .map_err(|_| DeviceError::load_failed("script contains an interior NUL byte"))?;
            let file = CString::new(path.to_string_lossy().into_owned())
                .map_err(|_| DeviceError::load_failed("script path contains an interior NUL"))?;
            let name = CString::new(module_name)
                .map_err(|_| DeviceError::load_failed("script name contains an interior NUL"))?;

            let module = PyModule::from_code(py, &code, &file, &name)
                .map_err(|e| DeviceError::load_failed(e.to_string()))?;

            let status = call_expecting(&module, ENTRY_INIT, &[], 1)?[0];
            if status < 0 {
                return Err(DeviceError::load_failed(format!(
                    "init returned status {status}"
                )));
            }

            let step = module
                .getattr(ATTR_STEP_INTERVAL)
                .map_err(|_| DeviceError::contract(ATTR_STEP_INTERVAL, "missing module attribute"))?;
            let step = extract_int(ATTR_STEP_INTERVAL, "attribute", &step)?;
            if step <= 0 {
                return Err(DeviceError::contract(
                    ATTR_STEP_INTERVAL,
                    format!("must be positive, got {step}"),
                ));
            }

            Ok((
                Self {
                    module: module.unbind(),
                },
                step as u64,
            ))
        })
    }

    /// Invokes the named function with integer arguments, expecting `expect`
    /// integer results.
    fn call(&self, name: &str, args: &[i64], expect: usize) -> Result<Vec<i64>, DeviceError> {
        Python::with_gil(|py| call_expecting(self.module.bind(py), name, args, expect))
    }
}

impl CosimModel for ScriptBridge {
    fn step(&mut self, now_ns: u64) -> Result<CallStatus, DeviceError> {
        let results = self.call(ENTRY_STEP, &[now_ns as i64], 1)?;
        CallStatus::from_raw(ENTRY_STEP, results[0])
    }

    fn read_data(&mut self, now_ns: u64, addr: u64) -> Result<(CallStatus, u32), DeviceError> {
        let results = self.call(ENTRY_READ, &[now_ns as i64, addr as i64], 2)?;
        let status = CallStatus::from_raw(ENTRY_READ, results[0])?;
        Ok((status, results[1] as u32))
    }

    fn write_data(
        &mut self,
        now_ns: u64,
        addr: u64,
        value: u32,
    ) -> Result<CallStatus, DeviceError> {
        let results = self.call(
            ENTRY_WRITE,
            &[now_ns as i64, addr as i64, i64::from(value)],
            1,
        )?;
        CallStatus::from_raw(ENTRY_WRITE, results[0])
    }
}

/// Resolves `name`, calls it with `args`, and validates `expect` result slots.
fn call_expecting(
    module: &Bound<'_, PyModule>,
    name: &str,
    args: &[i64],
    expect: usize,
) -> Result<Vec<i64>, DeviceError> {
    let func = module
        .getattr(name)
        .map_err(|_| DeviceError::contract(name, "entry point not defined"))?;

    let py = module.py();
    let arg_tuple = PyTuple::new(py, args.iter().copied())
        .map_err(|e| DeviceError::call_failed(name, format!("argument marshaling: {e}")))?;
    let result = func
        .call1(arg_tuple)
        .map_err(|e| DeviceError::call_failed(name, e.to_string()))?;

    if expect == 1 {
        return Ok(vec![extract_int(name, "result", &result)?]);
    }

    let tuple = result.downcast::<PyTuple>().map_err(|_| {
        DeviceError::contract(name, format!("expected a tuple of {expect} results"))
    })?;
    if tuple.len() != expect {
        return Err(DeviceError::contract(
            name,
            format!("expected {expect} results, got {}", tuple.len()),
        ));
    }

    let mut values = Vec::with_capacity(expect);
    for (slot, item) in tuple.iter().enumerate() {
        values.push(extract_int(name, &format!("result {slot}"), &item)?);
    }
    Ok(values)
}

/// Extracts an integer from one result slot, rejecting any other type.
fn extract_int(entry: &str, what: &str, value: &Bound<'_, PyAny>) -> Result<i64, DeviceError> {
    let int = value
        .downcast::<PyInt>()
        .map_err(|_| DeviceError::contract(entry, format!("{what} is not an integer")))?;
    int.extract::<i64>()
        .map_err(|_| DeviceError::contract(entry, format!("{what} does not fit in 64 bits")))
}
