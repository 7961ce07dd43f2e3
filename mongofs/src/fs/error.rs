//! Filesystem-level outcomes of a callback.

use crate::error::MongoFsError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// Path does not parse, or names a document that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Read offset lies past the end of the payload.
    #[error("offset {offset} is beyond the end of {path} ({len} bytes)")]
    OutOfRange { path: String, offset: u64, len: u64 },

    /// The node exists but the operation has no meaning for it.
    #[error("unsupported: {operation} on {node}")]
    Unsupported { operation: &'static str, node: String },

    /// The filesystem is read-only.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The backing store failed mid-request.
    #[error("I/O error: {0}")]
    Io(String),
}

impl FsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn unsupported(operation: &'static str, node: impl ToString) -> Self {
        Self::Unsupported {
            operation,
            node: node.to_string(),
        }
    }
}

impl From<MongoFsError> for FsError {
    fn from(e: MongoFsError) -> Self {
        FsError::Io(e.to_string())
    }
}

/// Convert FsError to std::io::Error for drivers that speak errno.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            e @ FsError::OutOfRange { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string())
            }
            e @ FsError::Unsupported { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, e.to_string())
            }
            e @ FsError::NotImplemented(_) => {
                io::Error::new(io::ErrorKind::PermissionDenied, e.to_string())
            }
            e @ FsError::InvalidPattern { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
            }
            FsError::Io(msg) => io::Error::other(msg),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let kind = |e: FsError| io::Error::from(e).kind();
        assert_eq!(kind(FsError::not_found("/x")), io::ErrorKind::NotFound);
        assert_eq!(
            kind(FsError::unsupported("read", "Root")),
            io::ErrorKind::Unsupported
        );
        assert_eq!(
            kind(FsError::NotImplemented("write")),
            io::ErrorKind::PermissionDenied
        );
        assert_eq!(
            kind(FsError::OutOfRange {
                path: "/a".into(),
                offset: 10,
                len: 2
            }),
            io::ErrorKind::UnexpectedEof
        );
        assert_eq!(kind(FsError::Io("down".into())), io::ErrorKind::Other);
    }

    #[test]
    fn test_store_errors_become_io() {
        let err = FsError::from(MongoFsError::Store("connection reset".into()));
        assert!(matches!(err, FsError::Io(msg) if msg.contains("connection reset")));
    }
}
