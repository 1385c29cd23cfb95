//! Export Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An export database error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for export database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// A node was written before its parent.
    #[display("parent {_1} of node {_0} has not been exported")]
    MissingParent(#[error(not(source))] String, #[error(not(source))] String),
    /// A value could not be converted to or from its column representation.
    #[display("invalid export data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
