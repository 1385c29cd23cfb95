//! The authoring store, as seen by the publish pipeline.
//!
//! The pipeline only reads the tree through [`ContentSource`], and only
//! writes back the handful of things a publish records: derived thumbnail
//! encodings, rebuilt exercise archives and the publish record itself.
//! [`SnapshotSource`] implements it over a JSON snapshot of one channel.

use crate::error::{ErrorKind, Result};
use crate::preset::Preset;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;
use studio_export::KindCount;
use studio_perseus::AssessmentItem;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Topic,
    Video,
    Audio,
    Exercise,
    Document,
    Html5,
    Slideshow,
}
impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Exercise => "exercise",
            Self::Document => "document",
            Self::Html5 => "html5",
            Self::Slideshow => "slideshow",
        }
    }
}
impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleVisibility {
    #[default]
    Learner,
    Coach,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLicense {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Custom licenses take their description from the node instead.
    #[serde(default)]
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub checksum: String,
    pub file_size: u64,
    /// Extension without the leading dot.
    pub file_format: String,
    pub preset: Preset,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub original_filename: String,
}
impl SourceFile {
    /// Name of the blob in content storage.
    pub fn storage_filename(&self) -> String {
        format!("{}.{}", self.checksum, self.file_format)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Primary key in the authoring store.
    pub id: String,
    /// Id the node is exported under.
    pub node_id: String,
    pub content_id: String,
    /// Authoring store id of the parent; `None` for the channel root.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: Option<SourceLicense>,
    /// Text of a custom license.
    #[serde(default)]
    pub license_description: Option<String>,
    #[serde(default)]
    pub copyright_holder: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub sort_order: f64,
    /// Untyped node configuration; see [`ExtraFields`](crate::exporter::ExtraFields).
    #[serde(default)]
    pub extra_fields: Value,
    #[serde(default)]
    pub role_visibility: RoleVisibility,
    #[serde(default)]
    pub changed: bool,
    #[serde(default = "complete_by_default")]
    pub complete: bool,
    #[serde(default)]
    pub published: bool,
    /// JSON object with a `base64` key holding a data URI.
    #[serde(default)]
    pub thumbnail_encoding: Option<String>,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assessment_items: Vec<AssessmentItem>,
}
fn complete_by_default() -> bool {
    true
}
impl SourceNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_exercise_archive(&self) -> bool {
        self.files.iter().any(|file| file.preset == Preset::Exercise)
    }
}

/// Statistics of one published version, kept by the authoring store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    pub version: u32,
    pub resource_count: u64,
    pub kind_count: Vec<KindCount>,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_published: OffsetDateTime,
    pub version_notes: String,
    pub included_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub author: String,
    /// Default language of nodes that don't specify one.
    #[serde(default)]
    pub language: Option<String>,
    /// Currently published version; `0` if never published.
    #[serde(default)]
    pub version: u32,
    /// Storage filename (`<checksum>.<ext>`) of the channel thumbnail, or a
    /// static asset URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub thumbnail_encoding: Option<Value>,
    /// Base64 data URI exported as the channel thumbnail.
    #[serde(default)]
    pub icon_encoding: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_published: Option<OffsetDateTime>,
    #[serde(default)]
    pub published_data: BTreeMap<u32, PublishRecord>,
}

/// The authoring store a channel is published from.
///
/// Thumbnail encodings and rebuilt exercise archives are saved while the
/// export is still running, so they remain in the source when a publish
/// fails. Only `record_publish` and `mark_published` wait for success.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn channel(&self) -> Result<ChannelInfo>;

    async fn root(&self) -> Result<SourceNode>;

    /// Children of a node, ordered by sort order.
    async fn children(&self, id: &str) -> Result<Vec<SourceNode>>;

    async fn descendant_count(&self, id: &str) -> Result<u64>;

    /// Whether any descendant of the node is something other than a topic.
    async fn has_resources(&self, id: &str) -> Result<bool>;

    /// Whether any node in the channel changed since the last publish.
    async fn has_changes(&self) -> Result<bool>;

    async fn save_thumbnail_encoding(&self, id: &str, encoding: &str) -> Result<()>;

    async fn save_icon_encoding(&self, encoding: &str) -> Result<()>;

    /// Attach a rebuilt exercise archive, replacing the previous one.
    async fn replace_exercise_archive(&self, id: &str, file: SourceFile) -> Result<()>;

    /// Bump the channel to `record.version` and keep the record in its history.
    async fn record_publish(&self, record: PublishRecord) -> Result<()>;

    /// Flag the exported nodes as published and unchanged. Skipped nodes
    /// keep their state.
    async fn mark_published(&self, ids: &[String]) -> Result<()>;
}

/// A channel and all of its nodes, as serialized by the authoring store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub channel: ChannelInfo,
    pub nodes: Vec<SourceNode>,
}

/// [`ContentSource`] over an in-memory [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotSource {
    snapshot: RwLock<Snapshot>,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot: RwLock::new(snapshot) }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).or_raise(|| ErrorKind::Snapshot)?;
        Ok(Self::new(snapshot))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::Io)?;
        Self::from_json(&json)
    }

    /// Write the snapshot back, including everything the publish recorded.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_vec_pretty(&*self.snapshot.read().await).or_raise(|| ErrorKind::Snapshot)?;
        tokio::fs::write(path, json).await.or_raise(|| ErrorKind::Io)
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }
}

/// Every descendant of `id`, breadth-first.
fn descendants<'a>(nodes: &'a [SourceNode], id: &str) -> Vec<&'a SourceNode> {
    let mut by_parent: HashMap<&str, Vec<&SourceNode>> = HashMap::new();
    for node in nodes {
        if let Some(parent) = node.parent_id.as_deref() {
            by_parent.entry(parent).or_default().push(node);
        }
    }
    let mut found = Vec::new();
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for child in by_parent.get(current).into_iter().flatten() {
            found.push(*child);
            queue.push_back(child.id.as_str());
        }
    }
    found
}

#[async_trait]
impl ContentSource for SnapshotSource {
    async fn channel(&self) -> Result<ChannelInfo> {
        Ok(self.snapshot.read().await.channel.clone())
    }

    async fn root(&self) -> Result<SourceNode> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .nodes
            .iter()
            .find(|node| node.is_root())
            .cloned()
            .ok_or_raise(|| ErrorKind::NodeNotFound(format!("root of channel {}", snapshot.channel.id)))
    }

    async fn children(&self, id: &str) -> Result<Vec<SourceNode>> {
        let snapshot = self.snapshot.read().await;
        let mut children: Vec<SourceNode> =
            snapshot.nodes.iter().filter(|node| node.parent_id.as_deref() == Some(id)).cloned().collect();
        children.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        Ok(children)
    }

    async fn descendant_count(&self, id: &str) -> Result<u64> {
        let snapshot = self.snapshot.read().await;
        Ok(descendants(&snapshot.nodes, id).len() as u64)
    }

    async fn has_resources(&self, id: &str) -> Result<bool> {
        let snapshot = self.snapshot.read().await;
        Ok(descendants(&snapshot.nodes, id).iter().any(|node| node.kind != ContentKind::Topic))
    }

    async fn has_changes(&self) -> Result<bool> {
        Ok(self.snapshot.read().await.nodes.iter().any(|node| node.changed))
    }

    async fn save_thumbnail_encoding(&self, id: &str, encoding: &str) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        let node = snapshot
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_raise(|| ErrorKind::NodeNotFound(id.to_string()))?;
        node.thumbnail_encoding = Some(encoding.to_string());
        Ok(())
    }

    async fn save_icon_encoding(&self, encoding: &str) -> Result<()> {
        self.snapshot.write().await.channel.icon_encoding = encoding.to_string();
        Ok(())
    }

    async fn replace_exercise_archive(&self, id: &str, file: SourceFile) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        let node = snapshot
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_raise(|| ErrorKind::NodeNotFound(id.to_string()))?;
        node.files.retain(|existing| existing.preset != Preset::Exercise);
        node.files.push(file);
        Ok(())
    }

    async fn record_publish(&self, record: PublishRecord) -> Result<()> {
        let mut snapshot = self.snapshot.write().await;
        let channel = &mut snapshot.channel;
        channel.version = record.version;
        channel.last_published = Some(record.date_published);
        channel.published_data.insert(record.version, record);
        Ok(())
    }

    async fn mark_published(&self, ids: &[String]) -> Result<()> {
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for node in &mut self.snapshot.write().await.nodes {
            if ids.contains(node.id.as_str()) {
                node.changed = false;
                node.published = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source() -> SnapshotSource {
        let snapshot = json!({
            "channel": {"id": "channel", "name": "Channel"},
            "nodes": [
                {"id": "root", "node_id": "n-root", "content_id": "c-root", "kind": "topic", "title": "Root"},
                {"id": "b", "node_id": "n-b", "content_id": "c-b", "parent_id": "root", "kind": "topic",
                 "title": "Empty", "sort_order": 2.0},
                {"id": "a", "node_id": "n-a", "content_id": "c-a", "parent_id": "root", "kind": "topic",
                 "title": "Full", "sort_order": 1.0},
                {"id": "v", "node_id": "n-v", "content_id": "c-v", "parent_id": "a", "kind": "video",
                 "title": "Video", "changed": true}
            ]
        });
        SnapshotSource::new(serde_json::from_value(snapshot).unwrap())
    }

    #[tokio::test]
    async fn test_children_are_sorted() {
        let source = source();
        assert_eq!(source.root().await.unwrap().id, "root");
        let ids: Vec<String> = source.children("root").await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_tree_queries() {
        let source = source();
        assert_eq!(source.descendant_count("root").await.unwrap(), 3);
        assert!(source.has_resources("a").await.unwrap());
        assert!(!source.has_resources("b").await.unwrap());
        assert!(source.has_changes().await.unwrap());
        source.mark_published(&["root".into(), "a".into(), "v".into()]).await.unwrap();
        assert!(!source.has_changes().await.unwrap());
        let published: Vec<String> =
            source.snapshot().await.nodes.into_iter().filter(|n| n.published).map(|n| n.id).collect();
        assert_eq!(published, ["root", "a", "v"]);
    }

    #[tokio::test]
    async fn test_missing_node() {
        let err = source().save_thumbnail_encoding("missing", "{}").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NodeNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_invalid_snapshot() {
        let err = SnapshotSource::from_json("{\"nodes\": []}").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Snapshot));
    }
}
