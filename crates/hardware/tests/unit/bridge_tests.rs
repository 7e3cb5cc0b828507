//! # Script Bridge Tests
//!
//! Exercises the embedded-Python bridge against real model scripts written
//! to temporary files: the initialization contract, typed call validation,
//! and the status conventions.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;

use cosim_core::bridge::{CallStatus, CosimModel, ScriptBridge};
use cosim_core::common::DeviceError;

/// Writes a model script into `dir` and returns its path.
///
/// Each script gets a unique file stem so the embedded interpreter keys every
/// load to a distinct `sys.modules` entry; a shared name would let one test's
/// module satisfy another's `import`, defeating the per-`TempDir` isolation.
fn write_script(dir: &TempDir, source: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.path().join(format!("model_{id}.py"));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(source.as_bytes()).unwrap();
    path
}

/// A fully conforming model used by the happy-path tests.
const CONFORMING_MODEL: &str = r#"
nanoseconds_per_step = 250_000

calls = []

def init():
    return 0

def coroutine_yield(time_ns):
    calls.append(("step", time_ns))
    return 0

def read_data(time_ns, addr):
    calls.append(("read", time_ns, addr))
    return 0, 0xABCD

def write_data(time_ns, addr, data):
    calls.append(("write", time_ns, addr, data))
    return 1
"#;

#[test]
fn load_returns_configured_step_interval() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, CONFORMING_MODEL);
    let (_bridge, step_ns) = ScriptBridge::load(&path).unwrap();
    assert_eq!(step_ns, 250_000);
}

#[test]
fn conforming_model_round_trips_all_entry_points() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, CONFORMING_MODEL);
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();

    assert_eq!(bridge.step(123).unwrap(), CallStatus::Ok);
    assert_eq!(
        bridge.read_data(456, 0x20).unwrap(),
        (CallStatus::Ok, 0xABCD)
    );
    assert_eq!(
        bridge.write_data(789, 0x20, 7).unwrap(),
        CallStatus::OkRequestInterrupt
    );
}

#[test]
fn missing_script_file_fails_load() {
    let err = ScriptBridge::load(std::path::Path::new("/nonexistent/model.py")).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptLoadFailed { .. }));
}

#[test]
fn syntax_error_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "def init(:\n    pass\n");
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptLoadFailed { .. }));
}

#[test]
fn missing_init_entry_point_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "nanoseconds_per_step = 100\n");
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn negative_init_status_fails_load() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "nanoseconds_per_step = 100\ndef init():\n    return -1\n",
    );
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptLoadFailed { .. }));
}

#[test]
fn non_integer_init_result_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "nanoseconds_per_step = 100\ndef init():\n    return \"ok\"\n",
    );
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn missing_step_interval_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "def init():\n    return 0\n");
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::ScriptContractViolation { ref entry, .. } if entry == "nanoseconds_per_step"
    ));
}

#[test]
fn non_positive_step_interval_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "nanoseconds_per_step = 0\ndef init():\n    return 0\n");
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn float_step_interval_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "nanoseconds_per_step = 0.5\ndef init():\n    return 0\n",
    );
    let err = ScriptBridge::load(&path).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn wrong_result_arity_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        r#"
nanoseconds_per_step = 100
def init():
    return 0
def read_data(time_ns, addr):
    return 0
"#,
    );
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();
    let err = bridge.read_data(0, 0x20).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn non_integer_result_slot_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        r#"
nanoseconds_per_step = 100
def init():
    return 0
def read_data(time_ns, addr):
    return 0, "data"
"#,
    );
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();
    let err = bridge.read_data(0, 0x20).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn raised_exception_is_a_call_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        r#"
nanoseconds_per_step = 100
def init():
    return 0
def coroutine_yield(time_ns):
    raise RuntimeError("model blew up")
"#,
    );
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();
    let err = bridge.step(0).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptCallFailed { .. }));
}

#[test]
fn missing_steady_state_entry_point_violates_contract() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "nanoseconds_per_step = 100\ndef init():\n    return 0\n");
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();
    let err = bridge.write_data(0, 0x20, 1).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptContractViolation { .. }));
}

#[test]
fn negative_status_surfaces_as_call_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        r#"
nanoseconds_per_step = 100
def init():
    return 0
def write_data(time_ns, addr, data):
    return -5
"#,
    );
    let (mut bridge, _) = ScriptBridge::load(&path).unwrap();
    let err = bridge.write_data(0, 0x20, 1).unwrap_err();
    assert!(matches!(err, DeviceError::ScriptCallFailed { .. }));
}
