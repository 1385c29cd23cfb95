//! Maps authoring nodes onto export records.

use crate::error::{ErrorKind, Result};
use crate::language;
use crate::source::{ChannelInfo, ContentKind, RoleVisibility, SourceNode};
use exn::ResultExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use studio_export::{AssessmentMetadataRecord, ExportWriter, NodeRecord, stable_id};
use studio_perseus::{ExerciseConfig, ExerciseSettings};
use tracing::instrument;

/// Typed view of a node's extra fields.
///
/// Parsed once when the node is exported; anything the pipeline doesn't
/// interpret is kept in `settings.extra` and ends up in `exercise.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraFields {
    pub settings: ExerciseSettings,
}

impl ExtraFields {
    /// Accepts an object, a string holding an object, or nothing at all.
    pub fn parse(node_id: &str, raw: &Value) -> Result<Self> {
        let invalid = || ErrorKind::InvalidExtraFields(node_id.to_string());
        let value = match raw {
            Value::Null => return Ok(Self::default()),
            Value::String(s) if s.trim().is_empty() => return Ok(Self::default()),
            Value::String(s) => serde_json::from_str(s).or_raise(invalid)?,
            other => other.clone(),
        };
        if !value.is_object() {
            exn::bail!(invalid());
        }
        let settings = ExerciseSettings::deserialize(value).or_raise(invalid)?;
        if settings.extra.get("options").is_some_and(|options| !options.is_object()) {
            exn::bail!(invalid());
        }
        Ok(Self { settings })
    }

    /// Player options, serialized for the export record.
    pub fn options(&self) -> String {
        match self.settings.extra.get("options") {
            Some(options) => options.to_string(),
            None => Value::Object(Map::new()).to_string(),
        }
    }
}

/// Writes a single node into the export.
pub struct NodeExporter<'a> {
    channel: &'a ChannelInfo,
}

impl<'a> NodeExporter<'a> {
    pub fn new(channel: &'a ChannelInfo) -> Self {
        Self { channel }
    }

    /// Export `node` under its already exported `parent`.
    ///
    /// Empty topics never reach the export, so every exported node is
    /// marked available.
    #[instrument(skip_all, fields(node = %node.node_id, kind = %node.kind))]
    pub async fn export(
        &self,
        writer: &mut ExportWriter,
        node: &SourceNode,
        parent: Option<&str>,
    ) -> Result<(NodeRecord, ExtraFields)> {
        let extra = ExtraFields::parse(&node.node_id, &node.extra_fields)?;

        let license = match &node.license {
            Some(license) => {
                let description = match license.is_custom {
                    true => node.license_description.clone().unwrap_or_default(),
                    false => license.description.clone(),
                };
                Some(writer.get_or_create_license(&license.name, &description).await.or_raise(|| ErrorKind::Export)?)
            },
            None => None,
        };

        let lang_id = match node.language.as_deref().or(self.channel.language.as_deref()) {
            Some(code) => {
                let language = language::lookup(code)?;
                writer.get_or_create_language(&language).await.or_raise(|| ErrorKind::Export)?;
                Some(language.id)
            },
            None => None,
        };

        if let Some(parent) = parent
            && !writer.node_exists(parent).await.or_raise(|| ErrorKind::Export)?
        {
            exn::bail!(ErrorKind::OrphanNode(node.node_id.clone()));
        }

        let record = NodeRecord {
            id: node.node_id.clone(),
            parent_id: parent.map(str::to_string),
            kind: node.kind.as_str().to_string(),
            title: match parent {
                Some(_) => node.title.clone(),
                None => self.channel.name.clone(),
            },
            content_id: node.content_id.clone(),
            channel_id: self.channel.id.clone(),
            author: node.author.clone(),
            description: node.description.clone(),
            sort_order: node.sort_order,
            license_id: license.as_ref().map(|l| l.id),
            license_name: license.as_ref().map(|l| l.name.clone()),
            license_description: license.as_ref().map(|l| l.description.clone()),
            license_owner: node.copyright_holder.clone().unwrap_or_default(),
            lang_id,
            coach_content: node.role_visibility == RoleVisibility::Coach,
            options: extra.options(),
            available: true,
        };
        writer.upsert_node(&record).await.or_raise(|| ErrorKind::Export)?;
        tracing::debug!("exported node");
        Ok((record, extra))
    }

    /// Record the exercise's assessment settings and return the derived
    /// configuration its archive is built from.
    pub async fn export_assessment_metadata(
        &self,
        writer: &mut ExportWriter,
        node: &SourceNode,
        extra: &ExtraFields,
    ) -> Result<ExerciseConfig> {
        let config = ExerciseConfig::derive(&extra.settings, &node.assessment_items)
            .or_raise(|| ErrorKind::Exercise(node.node_id.clone()))?;
        let metadata = AssessmentMetadataRecord {
            id: stable_id(&["assessment", &node.node_id]),
            node_id: node.node_id.clone(),
            assessment_item_ids: config.assessment_ids.clone(),
            number_of_assessments: u32::try_from(config.assessment_ids.len()).unwrap_or(u32::MAX),
            mastery_model: config.mastery.to_metadata_json(),
            randomize: config.randomize,
            is_manipulable: node.kind == ContentKind::Exercise,
        };
        writer.upsert_assessment_metadata(&metadata).await.or_raise(|| ErrorKind::Export)?;
        Ok(config)
    }

    /// Link the node to its tags, creating tags that don't exist yet.
    pub async fn map_tags(&self, writer: &mut ExportWriter, node: &SourceNode) -> Result<()> {
        writer.set_node_tags(&node.node_id, &node.tags).await.or_raise(|| ErrorKind::Export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use studio_export::Database;
    use studio_perseus::LegacyMasteryType;

    fn channel() -> ChannelInfo {
        serde_json::from_value(json!({"id": "channel", "name": "My Channel", "language": "en"})).unwrap()
    }

    fn node(id: &str, parent: Option<&str>, kind: &str) -> SourceNode {
        serde_json::from_value(json!({
            "id": id, "node_id": id, "content_id": format!("c-{id}"), "parent_id": parent,
            "kind": kind, "title": format!("Title {id}")
        }))
        .unwrap()
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(""))]
    #[case(json!({}))]
    fn test_empty_extra_fields(#[case] raw: Value) {
        let extra = ExtraFields::parse("n", &raw).unwrap();
        assert_eq!(extra, ExtraFields::default());
        assert_eq!(extra.options(), "{}");
    }

    #[test]
    fn test_extra_fields_from_string() {
        let raw = json!(r#"{"mastery_model": "do_all", "randomize": false, "options": {"completion": 1}}"#);
        let extra = ExtraFields::parse("n", &raw).unwrap();
        assert_eq!(extra.settings.mastery_model, Some(LegacyMasteryType::DoAll));
        assert_eq!(extra.settings.randomize, Some(false));
        assert_eq!(extra.options(), r#"{"completion":1}"#);
    }

    #[rstest]
    #[case(json!([1, 2]))]
    #[case(json!("not json"))]
    #[case(json!({"options": "nope"}))]
    #[case(json!({"mastery_model": "sometimes"}))]
    fn test_invalid_extra_fields(#[case] raw: Value) {
        let err = ExtraFields::parse("n", &raw).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidExtraFields(id) if id == "n"));
    }

    #[tokio::test]
    async fn test_root_takes_channel_name_and_default_language() {
        let db = Database::connect_in_memory().await.unwrap();
        let channel = channel();
        let exporter = NodeExporter::new(&channel);
        let mut writer = db.begin().await.unwrap();
        let (root, _) = exporter.export(&mut writer, &node("root", None, "topic"), None).await.unwrap();
        let (child, _) = exporter.export(&mut writer, &node("child", Some("root"), "video"), Some("root")).await.unwrap();
        assert_eq!(root.title, "My Channel");
        assert_eq!(child.title, "Title child");
        assert_eq!(child.lang_id.as_deref(), Some("en"));
        assert_eq!(child.channel_id, "channel");
    }

    #[tokio::test]
    async fn test_custom_license_uses_node_description() {
        let db = Database::connect_in_memory().await.unwrap();
        let channel = channel();
        let exporter = NodeExporter::new(&channel);
        let mut writer = db.begin().await.unwrap();
        let mut source = node("root", None, "topic");
        source.license = Some(crate::source::SourceLicense {
            name: "Special Permissions".into(),
            description: "generic".into(),
            is_custom: true,
        });
        source.license_description = Some("Ask first".into());
        source.copyright_holder = Some("Someone".into());
        let (record, _) = exporter.export(&mut writer, &source, None).await.unwrap();
        assert_eq!(record.license_name.as_deref(), Some("Special Permissions"));
        assert_eq!(record.license_description.as_deref(), Some("Ask first"));
        assert_eq!(record.license_owner, "Someone");
        assert!(record.license_id.is_some());
    }

    #[tokio::test]
    async fn test_orphan_node() {
        let db = Database::connect_in_memory().await.unwrap();
        let channel = channel();
        let mut writer = db.begin().await.unwrap();
        let err = NodeExporter::new(&channel)
            .export(&mut writer, &node("child", Some("root"), "video"), Some("root"))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::OrphanNode(id) if id == "child"));
    }

    #[tokio::test]
    async fn test_unknown_language() {
        let db = Database::connect_in_memory().await.unwrap();
        let channel = channel();
        let mut writer = db.begin().await.unwrap();
        let mut source = node("root", None, "topic");
        source.language = Some("klingon".into());
        let err = NodeExporter::new(&channel).export(&mut writer, &source, None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownLanguage(code) if code == "klingon"));
    }

    #[tokio::test]
    async fn test_coach_content_and_options() {
        let db = Database::connect_in_memory().await.unwrap();
        let channel = channel();
        let mut writer = db.begin().await.unwrap();
        let mut source = node("root", None, "topic");
        source.role_visibility = RoleVisibility::Coach;
        source.extra_fields = json!({"options": {"modality": "QUIZ"}});
        let (record, _) = NodeExporter::new(&channel).export(&mut writer, &source, None).await.unwrap();
        assert!(record.coach_content);
        assert!(record.available);
        assert_eq!(record.options, r#"{"modality":"QUIZ"}"#);
    }
}
