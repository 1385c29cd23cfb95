use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// A blob, keyed by checksum. Shared by every file that has the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileRecord {
    pub checksum: String,
    pub extension: String,
    pub file_size: u64,
    pub available: bool,
}

/// A file attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    /// Checksum of the [`LocalFileRecord`].
    pub checksum: String,
    pub node_id: String,
    pub preset: String,
    pub lang_id: Option<String>,
    pub supplementary: bool,
    pub thumbnail: bool,
    pub priority: Option<i64>,
    pub extension: String,
    pub file_size: u64,
    pub available: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LocalFileRow {
    pub(crate) id: String,
    pub(crate) extension: String,
    pub(crate) available: bool,
    pub(crate) file_size: i64,
}
impl TryFrom<&LocalFileRecord> for LocalFileRow {
    type Error = Error;
    fn try_from(record: &LocalFileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.checksum.clone(),
            extension: record.extension.clone(),
            available: record.available,
            file_size: i64::try_from(record.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
        })
    }
}
impl TryFrom<LocalFileRow> for LocalFileRecord {
    type Error = Error;
    fn try_from(row: LocalFileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            checksum: row.id,
            extension: row.extension,
            available: row.available,
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    id: String,
    local_file_id: String,
    contentnode_id: String,
    preset: String,
    lang_id: Option<String>,
    supplementary: bool,
    thumbnail: bool,
    priority: Option<i64>,
    extension: String,
    file_size: i64,
    available: bool,
}
impl TryFrom<FileRow> for FileRecord {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            checksum: row.local_file_id,
            node_id: row.contentnode_id,
            preset: row.preset,
            lang_id: row.lang_id,
            supplementary: row.supplementary,
            thumbnail: row.thumbnail,
            priority: row.priority,
            extension: row.extension,
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            available: row.available,
        })
    }
}
