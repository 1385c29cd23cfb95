//! Write side of the export: one transaction per publish.

use exn::ResultExt;
use sqlx::{Sqlite, Transaction};
use std::collections::BTreeSet;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::id::stable_id;
use crate::models::{
    AssessmentMetadataRecord, AssessmentMetadataRow, ChannelMetadataRecord, FileRecord, LanguageRecord, License,
    LocalFileRecord, LocalFileRow, NodeRecord,
};
use crate::tree::{TreeNode, compute_tree_indices};

/// Open write transaction on the export database.
///
/// Nothing is visible to readers until [`ExportWriter::commit`]; dropping
/// the writer rolls everything back.
pub struct ExportWriter {
    tx: Transaction<'static, Sqlite>,
    /// Nodes were written since tree indices were last computed.
    dirty: bool,
}

impl ExportWriter {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx, dirty: false }
    }

    pub async fn node_exists(&mut self, id: &str) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/node_exists.sql"))
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Insert or replace a node. Its parent must already be exported.
    pub async fn upsert_node(&mut self, node: &NodeRecord) -> Result<()> {
        if let Some(parent) = &node.parent_id
            && !self.node_exists(parent).await?
        {
            exn::bail!(ErrorKind::MissingParent(node.id.clone(), parent.clone()));
        }
        sqlx::query(include_str!("../queries/upsert_node.sql"))
            .bind(&node.id)
            .bind(&node.parent_id)
            .bind(&node.kind)
            .bind(&node.title)
            .bind(&node.content_id)
            .bind(&node.channel_id)
            .bind(&node.author)
            .bind(&node.description)
            .bind(node.sort_order)
            .bind(node.license_id)
            .bind(&node.license_name)
            .bind(&node.license_description)
            .bind(&node.license_owner)
            .bind(&node.lang_id)
            .bind(node.coach_content)
            .bind(&node.options)
            .bind(node.available)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        self.dirty = true;
        Ok(())
    }

    pub async fn get_or_create_license(&mut self, name: &str, description: &str) -> Result<License> {
        sqlx::query(include_str!("../queries/insert_license.sql"))
            .bind(name)
            .bind(description)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let id: i64 = sqlx::query_scalar(include_str!("../queries/get_license_id.sql"))
            .bind(name)
            .bind(description)
            .fetch_one(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(License { id, name: name.to_string(), description: description.to_string() })
    }

    pub async fn get_or_create_language(&mut self, language: &LanguageRecord) -> Result<()> {
        sqlx::query(include_str!("../queries/insert_language.sql"))
            .bind(&language.id)
            .bind(&language.code)
            .bind(&language.subcode)
            .bind(&language.name)
            .bind(&language.direction)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Record a blob. Returns `false` when the checksum was already known,
    /// in which case the existing row is left untouched.
    pub async fn get_or_create_local_file(&mut self, file: &LocalFileRecord) -> Result<bool> {
        let row = LocalFileRow::try_from(file)?;
        let result = sqlx::query(include_str!("../queries/insert_local_file.sql"))
            .bind(&row.id)
            .bind(&row.extension)
            .bind(row.available)
            .bind(row.file_size)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach a file to a node. The node and the local file must exist.
    pub async fn create_file(&mut self, file: &FileRecord) -> Result<()> {
        let file_size = i64::try_from(file.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?;
        sqlx::query(include_str!("../queries/insert_file.sql"))
            .bind(&file.id)
            .bind(&file.checksum)
            .bind(&file.node_id)
            .bind(&file.preset)
            .bind(&file.lang_id)
            .bind(file.supplementary)
            .bind(file.thumbnail)
            .bind(file.priority)
            .bind(&file.extension)
            .bind(file_size)
            .bind(file.available)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Replace the tags of a node. Tag names are shared between nodes and
    /// duplicates collapse to one link.
    pub async fn set_node_tags<S: AsRef<str>>(&mut self, node_id: &str, tags: &[S]) -> Result<()> {
        sqlx::query(include_str!("../queries/clear_node_tags.sql"))
            .bind(node_id)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let names: BTreeSet<&str> = tags.iter().map(AsRef::as_ref).filter(|name| !name.is_empty()).collect();
        for name in names {
            sqlx::query(include_str!("../queries/insert_tag.sql"))
                .bind(stable_id(&["tag", name]))
                .bind(name)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            let tag_id: String = sqlx::query_scalar(include_str!("../queries/get_tag_id.sql"))
                .bind(name)
                .fetch_one(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            sqlx::query(include_str!("../queries/link_tag.sql"))
                .bind(node_id)
                .bind(tag_id)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        Ok(())
    }

    pub async fn upsert_assessment_metadata(&mut self, metadata: &AssessmentMetadataRecord) -> Result<()> {
        let row = AssessmentMetadataRow::try_from(metadata)?;
        sqlx::query(include_str!("../queries/upsert_assessment_metadata.sql"))
            .bind(row.id)
            .bind(row.contentnode_id)
            .bind(row.assessment_item_ids)
            .bind(row.number_of_assessments)
            .bind(row.mastery_model)
            .bind(row.randomize)
            .bind(row.is_manipulable)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn upsert_channel_metadata(&mut self, channel: &ChannelMetadataRecord) -> Result<()> {
        sqlx::query(include_str!("../queries/upsert_channel_metadata.sql"))
            .bind(&channel.id)
            .bind(&channel.name)
            .bind(&channel.description)
            .bind(&channel.tagline)
            .bind(&channel.author)
            .bind(i64::from(channel.version))
            .bind(&channel.thumbnail)
            .bind(&channel.root_id)
            .bind(&channel.min_schema_version)
            .bind(&channel.last_updated)
            .execute(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Recompute nested-set indices for every node written so far.
    #[instrument(skip(self))]
    pub async fn rebuild_tree_indices(&mut self) -> Result<()> {
        let rows: Vec<(String, Option<String>, f64)> = sqlx::query_as(include_str!("../queries/list_tree_nodes.sql"))
            .fetch_all(&mut *self.tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let nodes: Vec<TreeNode> = rows
            .into_iter()
            .map(|(id, parent_id, sort_order)| TreeNode { id, parent_id, sort_order })
            .collect();
        let indices = compute_tree_indices(&nodes);
        for node in &nodes {
            let Some(index) = indices.get(&node.id) else { continue };
            sqlx::query(include_str!("../queries/update_tree_index.sql"))
                .bind(index.lft)
                .bind(index.rght)
                .bind(index.tree_id)
                .bind(index.level)
                .bind(&node.id)
                .execute(&mut *self.tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tracing::debug!(nodes = nodes.len(), "rebuilt tree indices");
        self.dirty = false;
        Ok(())
    }

    /// Finish the export. Tree indices are brought up to date first.
    pub async fn commit(mut self) -> Result<()> {
        if self.dirty {
            self.rebuild_tree_indices().await?;
        }
        self.tx.commit().await.or_raise(|| ErrorKind::Database)
    }
}
