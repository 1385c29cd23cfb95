//! Records written to and read back from the export database.
//!
//! Public records use domain types (`u64` sizes, `bool` flags, parsed JSON);
//! the `*Row` types mirror the columns exactly and exist only to cross the
//! sqlx boundary.

mod file;
mod metadata;
mod node;

pub use self::file::{FileRecord, LocalFileRecord};
pub(crate) use self::file::{FileRow, LocalFileRow};
pub use self::metadata::{AssessmentMetadataRecord, ChannelMetadataRecord};
pub(crate) use self::metadata::{AssessmentMetadataRow, ChannelMetadataRow};
pub use self::node::NodeRecord;
pub(crate) use self::node::NodeRow;
use serde::{Deserialize, Serialize};

/// A license row. Licenses are shared between nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    /// Full language id, e.g. `pt-BR`.
    pub id: String,
    pub code: String,
    pub subcode: Option<String>,
    pub name: String,
    pub direction: String,
}

/// Position of a node in the nested-set encoding of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeIndex {
    pub lft: i64,
    pub rght: i64,
    pub tree_id: i64,
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCount {
    #[serde(rename = "kind_id")]
    pub kind: String,
    pub count: u64,
}

/// Statistics of a finished export, computed from the database itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishStats {
    /// Nodes that are not topics.
    pub resource_count: u64,
    /// Node count per kind, root excluded, ordered by kind.
    pub kind_count: Vec<KindCount>,
    /// Bytes across distinct local files.
    pub size: u64,
    /// Languages of nodes and files, sorted.
    pub languages: Vec<String>,
}
