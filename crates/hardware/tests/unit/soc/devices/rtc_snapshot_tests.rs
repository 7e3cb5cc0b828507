//! # Persisted-State Tests
//!
//! Save/restore of the register file and tick offset, including the
//! asymmetric migration rule: exact round trips when the raw offset is
//! carried, documented lossy reconstruction when it is not.

use pretty_assertions::assert_eq;

use cosim_core::snapshot::DeviceSnapshot;
use cosim_core::time::NANOS_PER_SEC;

use crate::common::harness::{self, DATA, INT_MASK, LOAD, MATCH, RAW_STATUS};

#[test]
fn round_trip_with_offset_migration_is_exact() {
    let mut src = harness::rtc();
    src.write(LOAD, 0xABCD_0123);
    src.write(MATCH, 0xABCD_1000);
    src.write(INT_MASK, 1);
    src.clock.advance_reference_secs(9);
    let count_at_save = src.read(DATA);
    let bytes = src.rtc.save_state();

    let mut dst = harness::rtc();
    // Restore on a peer whose clocks match the saver's.
    dst.clock.advance_reference_secs(9);
    dst.rtc.load_state(&bytes).unwrap();

    assert!(dst.rtc.tick_offset_migrated());
    assert_eq!(dst.read(DATA), count_at_save);
    assert_eq!(dst.read(MATCH), 0xABCD_1000);
    assert_eq!(dst.read(INT_MASK), 1);
}

#[test]
fn round_trip_is_exact_even_across_clock_skew_when_migrated() {
    let mut src = harness::rtc();
    src.write(LOAD, 5_000);
    let bytes = src.rtc.save_state();

    // The restoring side's clocks share no history with the saver's; the raw
    // offset still transfers the counter exactly.
    let mut dst = harness::rtc();
    dst.clock.advance_reference_secs(1_000);
    dst.clock.advance_virtual_ns(123 * NANOS_PER_SEC);
    dst.rtc.load_state(&bytes).unwrap();

    assert_eq!(dst.read(DATA), 5_000 + 1_000);
}

#[test]
fn restore_without_subsection_reconstructs_within_downtime_drift() {
    let mut src = harness::rtc_with(false);
    src.write(LOAD, 700_000);
    src.clock.advance(3 * NANOS_PER_SEC);
    let count_at_save = src.read(DATA);
    let bytes = src.rtc.save_state();

    // Downtime: the reference clock runs on while the virtual clock is
    // stopped, as across a VM save/restore.
    let downtime_secs = 60;
    let mut dst = harness::rtc_with(false);
    dst.clock.advance(3 * NANOS_PER_SEC);
    dst.clock.advance_reference_secs(downtime_secs);
    dst.rtc.load_state(&bytes).unwrap();

    assert!(!dst.rtc.tick_offset_migrated());

    // The reconstruction tracks virtual time, so the restored counter lags
    // true wall time by at most the downtime (here: exactly).
    let restored = dst.read(DATA);
    let lag = count_at_save
        .wrapping_add(downtime_secs as u32)
        .wrapping_sub(restored);
    assert!(u64::from(lag) <= downtime_secs);
    assert_eq!(restored, count_at_save);
}

#[test]
fn restore_without_subsection_is_exact_when_clock_delta_is_unchanged() {
    let mut src = harness::rtc_with(false);
    src.write(LOAD, 123_456);
    let bytes = src.rtc.save_state();

    // Same reference/virtual delta at decode as at encode: no drift.
    let mut dst = harness::rtc_with(false);
    dst.rtc.load_state(&bytes).unwrap();
    assert_eq!(dst.read(DATA), 123_456);
}

#[test]
fn snapshot_without_migration_omits_raw_offset_field() {
    let mut with = harness::rtc();
    let mut without = harness::rtc_with(false);
    with.write(LOAD, 1);
    without.write(LOAD, 1);

    let with_bytes = with.rtc.save_state();
    let without_bytes = without.rtc.save_state();
    assert!(with_bytes.len() > without_bytes.len());
}

#[test]
fn restore_rearms_alarm_from_restored_match() {
    let mut src = harness::rtc();
    src.write(INT_MASK, 1);
    let target = src.read(DATA).wrapping_add(4);
    src.write(MATCH, target);
    let bytes = src.rtc.save_state();

    let mut dst = harness::rtc();
    dst.rtc.load_state(&bytes).unwrap();
    assert!(dst.rtc.alarm_armed());

    dst.clock.advance_reference_secs(4);
    dst.poll();
    assert_eq!(dst.read(RAW_STATUS), 1);
    assert!(dst.rtc.irq_level());
}

#[test]
fn restore_redrives_interrupt_line_from_status_and_mask() {
    let mut src = harness::rtc();
    src.write(INT_MASK, 1);
    let now = src.read(DATA);
    src.write(MATCH, now);
    assert!(src.rtc.irq_level());
    let bytes = src.rtc.save_state();

    let mut dst = harness::rtc();
    assert!(!dst.rtc.irq_level());
    dst.rtc.load_state(&bytes).unwrap();
    assert!(dst.rtc.irq_level());
}

#[test]
fn restore_rejects_foreign_snapshot() {
    use cosim_core::snapshot::{SnapshotVersion, SnapshotWriter};

    let w = SnapshotWriter::new(*b"ELSE", SnapshotVersion::new(1, 0));
    let bytes = w.finish();

    let mut dst = harness::rtc();
    assert!(dst.rtc.load_state(&bytes).is_err());
}
