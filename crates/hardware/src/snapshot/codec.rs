//! Tag-length-value snapshot encoding.
//!
//! Layout: a fixed header (four-byte device id, little-endian u16 major and
//! minor version) followed by fields of `u16 tag / u32 length / value`.
//! Decoding collects fields by tag; unknown tags are skipped so newer writers
//! stay readable by the same major version, and absent tags read as `None` so
//! older snapshots stay loadable by newer code.

use thiserror::Error;

/// Errors produced while parsing an encoded snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The byte stream ended inside the header or a field.
    #[error("snapshot truncated")]
    Truncated,

    /// The snapshot belongs to a different device.
    #[error("snapshot is for device {found:?}, expected {expected:?}")]
    WrongDevice {
        /// Id the reader was asked to verify.
        expected: [u8; 4],
        /// Id found in the header.
        found: [u8; 4],
    },

    /// The snapshot's major version is not supported by this decoder.
    #[error("unsupported snapshot major version {found}, supported {supported}")]
    UnsupportedVersion {
        /// Major version this decoder understands.
        supported: u16,
        /// Major version found in the header.
        found: u16,
    },

    /// A field's length does not match its expected fixed size.
    #[error("field tag {tag} has length {len}, expected {expected}")]
    WrongFieldLength {
        /// Tag of the malformed field.
        tag: u16,
        /// Length found in the stream.
        len: usize,
        /// Length the field type requires.
        expected: usize,
    },

    /// The same tag appeared twice in one snapshot.
    #[error("duplicate field tag {tag}")]
    DuplicateTag {
        /// The repeated tag.
        tag: u16,
    },
}

/// Result alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Major/minor snapshot format version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotVersion {
    /// Incompatible-change counter; readers reject unknown majors.
    pub major: u16,
    /// Compatible-addition counter; informational only.
    pub minor: u16,
}

impl SnapshotVersion {
    /// Builds a version constant.
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// Serializer for one device's snapshot section.
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    /// Starts a snapshot with the given device id and version header.
    pub fn new(device_id: [u8; 4], version: SnapshotVersion) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&device_id);
        buf.extend_from_slice(&version.major.to_le_bytes());
        buf.extend_from_slice(&version.minor.to_le_bytes());
        Self { buf }
    }

    fn field_raw(&mut self, tag: u16, value: &[u8]) {
        self.buf.extend_from_slice(&tag.to_le_bytes());
        self.buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(value);
    }

    /// Appends a `u32` field.
    pub fn field_u32(&mut self, tag: u16, value: u32) {
        self.field_raw(tag, &value.to_le_bytes());
    }

    /// Appends a `u64` field.
    pub fn field_u64(&mut self, tag: u16, value: u64) {
        self.field_raw(tag, &value.to_le_bytes());
    }

    /// Appends a boolean field (one byte, 0 or 1).
    pub fn field_bool(&mut self, tag: u16, value: bool) {
        self.field_raw(tag, &[u8::from(value)]);
    }

    /// Finalizes the snapshot and returns the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Parsed view over one device's snapshot section.
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    version: SnapshotVersion,
    fields: Vec<(u16, &'a [u8])>,
}

impl<'a> SnapshotReader<'a> {
    /// Parses the header and field table, verifying the device id.
    pub fn parse(bytes: &'a [u8], expected_id: [u8; 4]) -> SnapshotResult<Self> {
        if bytes.len() < 8 {
            return Err(SnapshotError::Truncated);
        }
        let mut found = [0u8; 4];
        found.copy_from_slice(&bytes[..4]);
        if found != expected_id {
            return Err(SnapshotError::WrongDevice {
                expected: expected_id,
                found,
            });
        }
        let major = u16::from_le_bytes([bytes[4], bytes[5]]);
        let minor = u16::from_le_bytes([bytes[6], bytes[7]]);

        let mut fields: Vec<(u16, &'a [u8])> = Vec::new();
        let mut rest = &bytes[8..];
        while !rest.is_empty() {
            if rest.len() < 6 {
                return Err(SnapshotError::Truncated);
            }
            let tag = u16::from_le_bytes([rest[0], rest[1]]);
            let len = u32::from_le_bytes([rest[2], rest[3], rest[4], rest[5]]) as usize;
            rest = &rest[6..];
            if rest.len() < len {
                return Err(SnapshotError::Truncated);
            }
            if fields.iter().any(|&(t, _)| t == tag) {
                return Err(SnapshotError::DuplicateTag { tag });
            }
            fields.push((tag, &rest[..len]));
            rest = &rest[len..];
        }

        Ok(Self {
            version: SnapshotVersion::new(major, minor),
            fields,
        })
    }

    /// Version found in the header.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Rejects snapshots from an unknown major version.
    pub fn ensure_major(&self, supported: u16) -> SnapshotResult<()> {
        if self.version.major == supported {
            Ok(())
        } else {
            Err(SnapshotError::UnsupportedVersion {
                supported,
                found: self.version.major,
            })
        }
    }

    fn raw(&self, tag: u16) -> Option<&'a [u8]> {
        self.fields
            .iter()
            .find(|&&(t, _)| t == tag)
            .map(|&(_, v)| v)
    }

    /// Returns whether the given tag is present.
    pub fn contains(&self, tag: u16) -> bool {
        self.raw(tag).is_some()
    }

    /// Reads a `u32` field; `None` if the tag is absent.
    pub fn u32(&self, tag: u16) -> SnapshotResult<Option<u32>> {
        match self.raw(tag) {
            None => Ok(None),
            Some(v) => {
                let bytes: [u8; 4] =
                    v.try_into().map_err(|_| SnapshotError::WrongFieldLength {
                        tag,
                        len: v.len(),
                        expected: 4,
                    })?;
                Ok(Some(u32::from_le_bytes(bytes)))
            }
        }
    }

    /// Reads a `u64` field; `None` if the tag is absent.
    pub fn u64(&self, tag: u16) -> SnapshotResult<Option<u64>> {
        match self.raw(tag) {
            None => Ok(None),
            Some(v) => {
                let bytes: [u8; 8] =
                    v.try_into().map_err(|_| SnapshotError::WrongFieldLength {
                        tag,
                        len: v.len(),
                        expected: 8,
                    })?;
                Ok(Some(u64::from_le_bytes(bytes)))
            }
        }
    }

    /// Reads a boolean field; `None` if the tag is absent.
    pub fn bool(&self, tag: u16) -> SnapshotResult<Option<bool>> {
        match self.raw(tag) {
            None => Ok(None),
            Some(v) => {
                if v.len() != 1 {
                    return Err(SnapshotError::WrongFieldLength {
                        tag,
                        len: v.len(),
                        expected: 1,
                    });
                }
                Ok(Some(v[0] != 0))
            }
        }
    }
}
