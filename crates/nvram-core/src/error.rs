//! Error types for the nvram-core library.
//!
//! Every failure the codec can report is a variant of [`Error`]. Per-line
//! defects in text input ([`Error::MissingEquals`], [`Error::EmptyName`],
//! [`Error::InvalidEscape`]) only cost the offending record; everything else
//! aborts conversion of the whole image or file.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for nvram operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a binary record was being read when the data ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    /// The 1-byte name length
    NameLength,
    /// The name bytes
    Name,
    /// The 2-byte value length
    ValueLength,
    /// The value bytes
    Value,
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RecordField::NameLength => "name length",
            RecordField::Name => "name",
            RecordField::ValueLength => "value length",
            RecordField::Value => "value",
        })
    }
}

/// Comprehensive error type for all nvram operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on a caller-supplied stream
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The image is shorter than its header or does not start with the magic tag
    #[error("invalid image header: {details}")]
    Header {
        /// Description of the mismatch
        details: String,
    },

    /// The header declares more records than the remaining bytes could hold
    #[error(
        "implausible record count {count}: {available} bytes after the header cannot hold that many records"
    )]
    ImplausibleRecordCount {
        /// Record count from the header
        count: u16,
        /// Bytes following the header
        available: usize,
    },

    /// A record ends before its declared length
    #[error("record {record}: truncated {field} at offset {offset} (need {needed} bytes, have {available})")]
    TruncatedRecord {
        /// 1-based record number
        record: usize,
        /// Field being read
        field: RecordField,
        /// Byte offset of the field in the image
        offset: usize,
        /// Bytes the field requires
        needed: usize,
        /// Bytes that were left
        available: usize,
    },

    /// A record name does not fit the 1-byte length field
    #[error("name is {len} bytes long, the limit is {max}")]
    NameTooLong {
        /// Actual name length
        len: usize,
        /// Maximum name length
        max: usize,
    },

    /// A record value does not fit the 2-byte length field
    #[error("value of '{name}' is {len} bytes long, the limit is {max}")]
    ValueTooLong {
        /// Name of the offending record, lossily decoded
        name: String,
        /// Actual value length
        len: usize,
        /// Maximum value length
        max: usize,
    },

    /// More records than the 2-byte record count can describe
    #[error("too many records: the limit is {max}")]
    TooManyRecords {
        /// Maximum record count
        max: usize,
    },

    /// Malformed escape sequence in text input
    #[error("invalid escape sequence at offset {offset}: {details}")]
    InvalidEscape {
        /// Byte offset of the backslash
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// An earlier write failed partway through a record
    #[error("image writer is unusable after an earlier write failure")]
    WriterPoisoned,

    /// Text line without a `=` separator
    #[error("missing equals sign")]
    MissingEquals,

    /// Text line whose name part is empty
    #[error("name is empty")]
    EmptyName,
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new header error
    pub fn header(details: impl Into<String>) -> Self {
        Self::Header {
            details: details.into(),
        }
    }

    /// Creates a new invalid escape error
    pub fn invalid_escape(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidEscape {
            offset,
            details: details.into(),
        }
    }

    /// Returns true if the error concerns the image header rather than a record
    pub fn is_header_error(&self) -> bool {
        matches!(self, Self::Header { .. } | Self::ImplausibleRecordCount { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TruncatedRecord {
            record: 3,
            field: RecordField::Value,
            offset: 42,
            needed: 100,
            available: 50,
        };
        let msg = err.to_string();
        assert!(msg.contains("record 3"));
        assert!(msg.contains("truncated value"));
        assert!(msg.contains("need 100 bytes, have 50"));
    }

    #[test]
    fn test_is_header_error() {
        assert!(Error::header("short").is_header_error());
        assert!(Error::ImplausibleRecordCount {
            count: 9,
            available: 0
        }
        .is_header_error());
        assert!(!Error::MissingEquals.is_header_error());
    }
}
