//! Publish Error Types
//!
//! Lower layers (export database, exercise archives, storage) are raised
//! into these kinds with `or_raise`, so the root cause stays attached to the
//! single publish failure surfaced to the caller.

use derive_more::{Display, Error};

/// A publish error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for publish operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing changed since the last publish. Retry with `force` to publish anyway.
    #[display("no nodes have changed since the last publish")]
    NoChanges,
    #[display("channel {_0} is already being published")]
    AlreadyPublishing(#[error(not(source))] String),
    /// The publish token was issued for another channel.
    #[display("publish token does not belong to channel {_0}")]
    WrongChannel(#[error(not(source))] String),
    /// A node was reached before its parent was exported. Indicates a bug in
    /// the traversal.
    #[display("parent of node {_0} has not been exported")]
    OrphanNode(#[error(not(source))] String),
    #[display("unknown language code: {_0}")]
    UnknownLanguage(#[error(not(source))] String),
    #[display("invalid extra fields on node {_0}")]
    InvalidExtraFields(#[error(not(source))] String),
    #[display("node not found: {_0}")]
    NodeNotFound(#[error(not(source))] String),
    #[display("authoring store error")]
    Source,
    #[display("invalid channel snapshot")]
    Snapshot,
    #[display("export database error")]
    Export,
    #[display("could not load exercise templates")]
    Templates,
    #[display("could not build exercise for node {_0}")]
    Exercise(#[error(not(source))] String),
    #[display("storage error")]
    Storage,
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Source | Self::Storage | Self::Io)
    }
}
