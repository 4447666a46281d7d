//! Common error types for the fingerprint bridge

use std::io;
use std::path::Path;
use thiserror::Error;

/// Common result type for fpb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the stores, the dispatcher and the HTTP layer
#[derive(Error, Debug)]
pub enum Error {
    /// A required request parameter was absent
    #[error("{0}")]
    MissingParameter(String),

    /// A request parameter was present but unusable
    #[error("{0}")]
    InvalidParameter(String),

    /// Unrecognized `action` value
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Network call to the device failed or timed out
    #[error("Device unreachable at {url}: {detail}")]
    DeviceUnreachable { url: String, detail: String },

    /// Durable medium cannot be written, created or truncated
    #[error("Not writable: {path}: {detail}")]
    NotWritable { path: String, detail: String },

    /// Device report matched no classification rule
    #[error("Unrecognized device report: {0}")]
    Unrecognized(String),

    /// Ledger line that cannot be split into its two fields
    #[error("Malformed ledger record at line {line}: {content:?}")]
    MalformedRecord { line: usize, content: String },

    /// Ingestion body carried neither a report nor an attendance event
    #[error("No recognized data received from device")]
    NoRecognizedData,

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map an I/O failure on `path` into `NotWritable` when the medium refuses
    /// the write, otherwise keep it as a plain `Io` error.
    pub fn from_write(err: io::Error, path: &Path) -> Self {
        let refused = matches!(
            err.kind(),
            io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
        ) || err.raw_os_error() == Some(EROFS);

        if refused {
            Error::NotWritable {
                path: path.display().to_string(),
                detail: err.to_string(),
            }
        } else {
            Error::Io(err)
        }
    }

    /// Short variant name, used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingParameter(_) => "MissingParameter",
            Error::InvalidParameter(_) => "InvalidParameter",
            Error::InvalidAction(_) => "InvalidAction",
            Error::DeviceUnreachable { .. } => "DeviceUnreachable",
            Error::NotWritable { .. } => "NotWritable",
            Error::Unrecognized(_) => "Unrecognized",
            Error::MalformedRecord { .. } => "MalformedRecord",
            Error::NoRecognizedData => "NoRecognizedData",
            Error::Io(_) => "Io",
            Error::Config(_) => "Config",
        }
    }
}

// Read-only filesystem (POSIX errno 30)
const EROFS: i32 = 30;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_permission_denied_maps_to_not_writable() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let mapped = Error::from_write(err, &PathBuf::from("/data/attendance_log.csv"));
        match mapped {
            Error::NotWritable { path, .. } => assert_eq!(path, "/data/attendance_log.csv"),
            other => panic!("expected NotWritable, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_maps_to_not_writable() {
        let err = io::Error::new(io::ErrorKind::NotFound, "no such directory");
        let mapped = Error::from_write(err, &PathBuf::from("/missing/dir/file"));
        assert_eq!(mapped.kind(), "NotWritable");
    }

    #[test]
    fn test_other_io_errors_stay_generic() {
        let err = io::Error::new(io::ErrorKind::Interrupted, "interrupted");
        let mapped = Error::from_write(err, &PathBuf::from("/data/x"));
        assert_eq!(mapped.kind(), "Io");
    }

    #[test]
    fn test_missing_parameter_message_is_verbatim() {
        let err = Error::MissingParameter("ID is required for enrollment".to_string());
        assert_eq!(err.to_string(), "ID is required for enrollment");
    }
}
