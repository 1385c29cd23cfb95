//! Perseus Error Types
//!
//! Errors raised while normalizing assessment items and assembling exercise
//! archives. Storage failures are raised into [`ErrorKind::Storage`] so that
//! the originating backend error stays attached to the tree.

use derive_more::{Display, Error};

/// A Perseus error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for Perseus operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The assessment item's type has no template.
    #[display("unsupported assessment item type: {_0}")]
    UnsupportedItemType(#[error(not(source))] String),
    /// An exercise using `do_all` has no assessment items to master.
    #[display("exercise uses do_all mastery but has no assessment items")]
    EmptyExercise,
    /// Unrecognised legacy mastery model name.
    #[display("unknown mastery model: {_0}")]
    UnknownMasteryModel(#[error(not(source))] String),
    /// Graphie blob did not contain both the SVG and JSON sections.
    #[display("malformed graphie file: {_0}")]
    MalformedGraphie(#[error(not(source))] String),
    /// Template failed to compile or render.
    #[display("issue rendering Perseus template: {_0}")]
    Template(#[error(not(source))] &'static str),
    /// Serializing exercise or item data to JSON failed.
    #[display("could not serialize {_0}")]
    Serialize(#[error(not(source))] &'static str),
    /// Reading an embedded asset from the content store failed.
    #[display("could not read {_0} from content storage")]
    Storage(#[error(not(source))] String),
    /// Archive could not be assembled (duplicate entry, zip32 limits).
    #[display("invalid archive: {_0}")]
    Archive(#[error(not(source))] String),
    /// Writing the archive to disk failed.
    #[display("I/O error writing archive")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io)
    }
}
