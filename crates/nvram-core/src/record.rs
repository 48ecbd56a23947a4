//! The name/value record shared by the binary and text formats.

use std::fmt;

/// Maximum name length, bounded by the 1-byte length prefix
pub const MAX_NAME_LEN: usize = u8::MAX as usize;

/// Maximum value length, bounded by the 2-byte length prefix
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// Maximum number of records, bounded by the 2-byte header count
pub const MAX_RECORDS: usize = u16::MAX as usize;

/// A single NVRAM variable.
///
/// Both halves are raw bytes. Names are expected to be printable ASCII and
/// values may hold anything, but neither is enforced here; length limits are
/// checked when the record is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    /// Variable name
    pub name: Vec<u8>,
    /// Variable value
    pub value: Vec<u8>,
}

impl Record {
    /// Creates a new record
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns the name, replacing invalid UTF-8 for display purposes
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Number of bytes this record occupies in a binary image
    pub fn encoded_len(&self) -> usize {
        1 + self.name.len() + 2 + self.value.len()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} byte value)",
            String::from_utf8_lossy(&self.name),
            self.value.len()
        )
    }
}
