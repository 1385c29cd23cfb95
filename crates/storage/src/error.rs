//! Storage errors.
//!
//! Backends report *where* an operation failed (the relative storage path)
//! rather than the absolute location on disk, so errors read the same
//! regardless of which backend produced them.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("no blob stored at {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied writing {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path is empty, contains a null byte, or escapes the storage root.
    #[display("invalid storage path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Checksums name directories, so they must be at least two ASCII
    /// alphanumeric characters.
    #[display("invalid checksum: {_0}")]
    InvalidChecksum(#[error(not(source))] String),
    /// The backend could not service the request at all.
    #[display("storage backend {_0} unavailable")]
    Unavailable(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}
