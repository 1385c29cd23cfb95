//! SQLite export database written by a channel publish.
//!
//! Every publish writes a fresh database that the learning platform imports
//! as-is. The database holds the content tree in nested-set form, the files
//! attached to each node, and channel-level metadata.
//!
//! # Architecture
//! - [`Database`] owns the connection pool and the read side: listing what
//!   was exported and computing [`PublishStats`].
//! - [`ExportWriter`] is the single write transaction of a publish. Parents
//!   must be written before their children; tree indices are recomputed on
//!   commit.
//! - Blobs are keyed by checksum: [`LocalFileRecord`]s are shared by every
//!   [`FileRecord`] with the same content.

mod db;
pub mod error;
mod id;
mod models;
mod tree;
mod writer;

pub use crate::db::Database;
pub use crate::id::stable_id;
pub use crate::models::{
    AssessmentMetadataRecord, ChannelMetadataRecord, FileRecord, KindCount, LanguageRecord, License, LocalFileRecord,
    NodeRecord, PublishStats, TreeIndex,
};
pub use crate::tree::{TreeNode, compute_tree_indices};
pub use crate::writer::ExportWriter;
