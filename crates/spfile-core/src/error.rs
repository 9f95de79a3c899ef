//! Error types for the spfile-core library.
//!
//! Low-level decoding reports precise variants (bad magic numbers, unexpected
//! string tags, inflate failures). The domain reader folds all of them into
//! [`Error::InvalidFile`], so callers trying several formats in turn only need
//! to check one variant.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for spfile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all spfile operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input is not a valid SP file. Wraps the lower-level cause.
    #[error("input is not a valid SP file: {source}")]
    InvalidFile {
        /// Underlying decode failure
        #[source]
        source: Box<Error>,
    },

    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Underlying stream error, including truncated input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header, row or trailer magic number did not match
    #[error("unexpected {context} magic number: expected {expected:#010x}, found {found:#010x}")]
    UnexpectedMagic {
        /// What was being read (table header, row, trailer)
        context: &'static str,
        /// The magic number the reader required
        expected: u32,
        /// The value actually present
        found: u32,
    },

    /// A string did not start with the expected type tag
    #[error("unexpected string format: type tag {tag}")]
    UnexpectedStringType {
        /// The tag byte that was read
        tag: u8,
    },

    /// A table of undocumented zero-size rows contained rows
    #[error("unexpected records in table of unknown layout (row magic {magic:#010x})")]
    UnexpectedRecords {
        /// Row magic of the table
        magic: u32,
    },

    /// The version string could not be interpreted
    #[error("invalid version string '{version}'")]
    InvalidVersion {
        /// The version text as read
        version: String,
    },

    /// A required table was not present in the container
    #[error("table '{name}' not found")]
    MissingTable {
        /// Table name
        name: String,
    },

    /// A directory entry carried a negative offset
    #[error("table '{name}' has negative offset {offset}")]
    InvalidTableOffset {
        /// Directory name of the table
        name: String,
        /// Offset as stored in the directory
        offset: i32,
    },

    /// Table data started before the current stream position
    #[error("table '{name}' at offset {offset} overlaps data ending at {position}")]
    TableOverlap {
        /// Table name
        name: String,
        /// Declared offset of the table
        offset: u64,
        /// Stream position already reached
        position: u64,
    },

    /// A table did not fit in its declared span
    #[error("table '{name}' is shorter than its embedded name")]
    TableTruncated {
        /// Table name
        name: String,
    },

    /// Inflating a table payload failed
    #[error("failed to inflate table '{name}': {source}")]
    Inflate {
        /// Table name
        name: String,
        /// Underlying decompression error
        #[source]
        source: std::io::Error,
    },

    /// A table inflated beyond the configured limit
    #[error("table '{name}' exceeds the {limit} byte limit")]
    TableTooLarge {
        /// Table name
        name: String,
        /// Configured limit in bytes
        limit: usize,
    },

    /// Tables nested deeper than the configured limit
    #[error("tables nested deeper than {limit} levels")]
    NestingTooDeep {
        /// Configured limit
        limit: usize,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps any error as an invalid-file error. Already wrapped errors are
    /// returned unchanged.
    pub fn invalid_file(source: Error) -> Self {
        match source {
            err @ Self::InvalidFile { .. } => err,
            other => Self::InvalidFile {
                source: Box::new(other),
            },
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new magic number mismatch error
    pub fn unexpected_magic(context: &'static str, expected: u32, found: u32) -> Self {
        Self::UnexpectedMagic {
            context,
            expected,
            found,
        }
    }

    /// Creates a new missing table error
    pub fn missing_table(name: impl Into<String>) -> Self {
        Self::MissingTable { name: name.into() }
    }

    /// Creates a new inflate error
    pub fn inflate(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Inflate {
            name: name.into(),
            source,
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is the top-level "not a valid SP file" error
    pub fn is_invalid_file(&self) -> bool {
        matches!(self, Self::InvalidFile { .. })
    }

    /// Returns true if the failure came from a framing magic number mismatch,
    /// looking through an invalid-file wrapper
    pub fn is_structural(&self) -> bool {
        match self {
            Self::InvalidFile { source } => source.is_structural(),
            Self::UnexpectedMagic { .. }
            | Self::UnexpectedRecords { .. }
            | Self::InvalidTableOffset { .. }
            | Self::TableOverlap { .. }
            | Self::TableTruncated { .. }
            | Self::NestingTooDeep { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unexpected_magic("table header", 0x39AF_547A, 0);
        assert!(err.to_string().contains("table header"));
        assert!(err.to_string().contains("0x39af547a"));
    }

    #[test]
    fn test_invalid_file_wraps_once() {
        let err = Error::invalid_file(Error::missing_table("Tasks"));
        assert!(err.is_invalid_file());
        let again = Error::invalid_file(err);
        match again {
            Error::InvalidFile { source } => assert!(!source.is_invalid_file()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_is_structural() {
        let err = Error::invalid_file(Error::unexpected_magic("row", 1, 2));
        assert!(err.is_structural());
        assert!(!Error::missing_table("Calendars").is_structural());
    }
}
