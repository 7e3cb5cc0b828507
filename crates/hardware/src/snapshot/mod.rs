//! Persisted device state.
//!
//! This module defines the save/restore boundary for bus devices:
//! 1. **Codec:** A small tag-length-value encoding with explicit device id
//!    and version, skipping unknown tags for forward compatibility.
//! 2. **Contract:** The [`DeviceSnapshot`] trait implemented by devices that
//!    carry persisted state.
//!
//! Snapshot operations run only between construction and teardown, never
//! concurrently with guest accesses or timer polling.

/// Tag-length-value snapshot encoding (writer, reader, errors).
pub mod codec;

pub use codec::{SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter};

/// Save/restore contract for devices with persisted state.
///
/// The id must stay stable forever; additions within the same major version
/// must be new optional tags so that older snapshots still decode.
pub trait DeviceSnapshot {
    /// Stable four-byte identifier of the device's snapshot section.
    fn device_id(&self) -> [u8; 4];

    /// Format version written by [`save_state`](Self::save_state).
    fn device_version(&self) -> SnapshotVersion;

    /// Serializes the device's persisted state.
    fn save_state(&self) -> Vec<u8>;

    /// Restores persisted state from an encoded snapshot.
    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()>;
}
