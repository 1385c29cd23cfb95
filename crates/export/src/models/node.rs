use crate::error::{Error, ErrorKind};
use crate::models::TreeIndex;
use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// One exported content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub kind: String,
    pub title: String,
    pub content_id: String,
    pub channel_id: String,
    pub author: String,
    pub description: String,
    pub sort_order: f64,
    pub license_id: Option<i64>,
    pub license_name: Option<String>,
    pub license_description: Option<String>,
    pub license_owner: String,
    pub lang_id: Option<String>,
    pub coach_content: bool,
    /// Serialized JSON object.
    pub options: String,
    pub available: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct NodeRow {
    id: String,
    parent_id: Option<String>,
    kind: String,
    title: String,
    content_id: String,
    channel_id: String,
    author: String,
    description: String,
    sort_order: f64,
    license_id: Option<i64>,
    license_name: Option<String>,
    license_description: Option<String>,
    license_owner: String,
    lang_id: Option<String>,
    coach_content: bool,
    options: String,
    available: bool,
    lft: i64,
    rght: i64,
    tree_id: i64,
    level: i64,
}
impl NodeRow {
    pub(crate) fn into_record(self) -> Result<(NodeRecord, TreeIndex), Error> {
        let row = self;
        // Options are stored verbatim, but anything unreadable here would be
        // unreadable for the importer too.
        serde_json::from_str::<serde_json::Value>(&row.options).or_raise(|| ErrorKind::InvalidData("node options"))?;
        let record = NodeRecord {
            id: row.id,
            parent_id: row.parent_id,
            kind: row.kind,
            title: row.title,
            content_id: row.content_id,
            channel_id: row.channel_id,
            author: row.author,
            description: row.description,
            sort_order: row.sort_order,
            license_id: row.license_id,
            license_name: row.license_name,
            license_description: row.license_description,
            license_owner: row.license_owner,
            lang_id: row.lang_id,
            coach_content: row.coach_content,
            options: row.options,
            available: row.available,
        };
        let tree = TreeIndex { lft: row.lft, rght: row.rght, tree_id: row.tree_id, level: row.level };
        Ok((record, tree))
    }
}
