use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Assessment settings of an exercise node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentMetadataRecord {
    pub id: String,
    pub node_id: String,
    pub assessment_item_ids: Vec<String>,
    pub number_of_assessments: u32,
    /// `{"type": <legacy type>, "n": .., "m": ..}`
    pub mastery_model: Value,
    pub randomize: bool,
    pub is_manipulable: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct AssessmentMetadataRow {
    pub(crate) id: String,
    pub(crate) contentnode_id: String,
    pub(crate) assessment_item_ids: String,
    pub(crate) number_of_assessments: i64,
    pub(crate) mastery_model: String,
    pub(crate) randomize: bool,
    pub(crate) is_manipulable: bool,
}
impl TryFrom<&AssessmentMetadataRecord> for AssessmentMetadataRow {
    type Error = Error;
    fn try_from(record: &AssessmentMetadataRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id.clone(),
            contentnode_id: record.node_id.clone(),
            assessment_item_ids: serde_json::to_string(&record.assessment_item_ids)
                .or_raise(|| ErrorKind::InvalidData("assessment item ids"))?,
            number_of_assessments: i64::from(record.number_of_assessments),
            mastery_model: serde_json::to_string(&record.mastery_model)
                .or_raise(|| ErrorKind::InvalidData("mastery model"))?,
            randomize: record.randomize,
            is_manipulable: record.is_manipulable,
        })
    }
}
impl TryFrom<AssessmentMetadataRow> for AssessmentMetadataRecord {
    type Error = Error;
    fn try_from(row: AssessmentMetadataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            node_id: row.contentnode_id,
            assessment_item_ids: serde_json::from_str(&row.assessment_item_ids)
                .or_raise(|| ErrorKind::InvalidData("assessment item ids"))?,
            number_of_assessments: u32::try_from(row.number_of_assessments)
                .or_raise(|| ErrorKind::InvalidData("number of assessments"))?,
            mastery_model: serde_json::from_str(&row.mastery_model)
                .or_raise(|| ErrorKind::InvalidData("mastery model"))?,
            randomize: row.randomize,
            is_manipulable: row.is_manipulable,
        })
    }
}

/// Channel-level metadata. One row per export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadataRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tagline: Option<String>,
    pub author: String,
    /// The version being published.
    pub version: u32,
    /// Base64 data URI, or empty.
    pub thumbnail: String,
    pub root_id: String,
    pub min_schema_version: String,
    pub last_updated: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ChannelMetadataRow {
    id: String,
    name: String,
    description: String,
    tagline: Option<String>,
    author: String,
    version: i64,
    thumbnail: String,
    root_id: String,
    min_schema_version: String,
    last_updated: Option<String>,
}
impl TryFrom<ChannelMetadataRow> for ChannelMetadataRecord {
    type Error = Error;
    fn try_from(row: ChannelMetadataRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            tagline: row.tagline,
            author: row.author,
            version: u32::try_from(row.version).or_raise(|| ErrorKind::InvalidData("channel version"))?,
            thumbnail: row.thumbnail,
            root_id: row.root_id,
            min_schema_version: row.min_schema_version,
            last_updated: row.last_updated,
        })
    }
}
