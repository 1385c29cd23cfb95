//! The publish pipeline: walks the tree into a fresh export database and
//! hands the finished database to storage.

use crate::error::{ErrorKind, Result};
use crate::exporter::NodeExporter;
use crate::files::FileAssociator;
use crate::lock::{PublishLock, PublishToken};
use crate::preset::Preset;
use crate::progress::{ProgressSink, ProgressTracker, PublishState};
use crate::source::{ChannelInfo, ContentKind, ContentSource, PublishRecord, SourceFile, SourceNode};
use crate::thumbnail;
use exn::ResultExt;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use studio_config::{Config, ProgressRange};
use studio_export::{ChannelMetadataRecord, Database, PublishStats, stable_id};
use studio_perseus::{ExerciseArchiveBuilder, ExerciseConfig, ItemFailurePolicy, Templates};
use studio_storage::{BackendHandle, ContentStore};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

/// Oldest importer schema that can read the export.
const MIN_SCHEMA_VERSION: &str = "1";
const DATABASE_EXTENSION: &str = "sqlite3";
const EXERCISE_EXTENSION: &str = "perseus";

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Publish even when nothing changed.
    pub force: bool,
    /// Rebuild every exercise archive, not only those of changed nodes.
    pub force_exercises: bool,
    pub version_notes: String,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub content_prefix: PathBuf,
    pub database_prefix: PathBuf,
    pub item_failure_policy: ItemFailurePolicy,
    pub thumbnail_size: u32,
    pub progress: ProgressRange,
    /// Directory temporary export databases are created in. Defaults to the
    /// system temporary directory.
    pub temp_dir: Option<PathBuf>,
}
impl From<&Config> for PublishSettings {
    fn from(config: &Config) -> Self {
        Self {
            content_prefix: config.storage.content_prefix.clone(),
            database_prefix: config.storage.database_prefix.clone(),
            item_failure_policy: config.publish.item_failure_policy,
            thumbnail_size: config.publish.thumbnail_size,
            progress: config.publish.progress,
            temp_dir: None,
        }
    }
}
impl Default for PublishSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// What a successful publish produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub channel_id: String,
    pub version: u32,
    /// Location of the export database on the storage backend.
    pub database_path: PathBuf,
    pub stats: PublishStats,
    pub published_at: OffsetDateTime,
}

pub struct Publisher<S> {
    source: S,
    backend: BackendHandle,
    store: ContentStore,
    templates: Templates,
    settings: PublishSettings,
}

impl<S: ContentSource> Publisher<S> {
    pub fn new(source: S, backend: BackendHandle, settings: PublishSettings) -> Result<Self> {
        let templates = Templates::builtin().or_raise(|| ErrorKind::Templates)?;
        let store = ContentStore::new(backend.clone(), settings.content_prefix.clone());
        Ok(Self { source, backend, store, templates, settings })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Acquire the channel's publish lock, publish, and release the lock
    /// again however the publish ends.
    pub async fn publish_channel(
        &self,
        lock: &PublishLock,
        options: &PublishOptions,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<ExportArtifact> {
        let channel = self.source.channel().await?;
        let token = lock.acquire(&channel.id)?;
        self.publish(&token, options, sink).await
    }

    /// Publish the channel the token was issued for.
    ///
    /// The export is written to a private temporary database which is only
    /// copied to storage once complete; it is removed on every exit path.
    #[instrument(skip_all, fields(channel = %token.channel_id(), force = options.force))]
    pub async fn publish(
        &self,
        token: &PublishToken,
        options: &PublishOptions,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<ExportArtifact> {
        let mut channel = self.source.channel().await?;
        if token.channel_id() != channel.id {
            exn::bail!(ErrorKind::WrongChannel(channel.id));
        }
        channel.icon_encoding = self.icon_encoding(&channel).await;
        self.source.save_icon_encoding(&channel.icon_encoding).await?;

        if !options.force && !self.source.has_changes().await? {
            tracing::debug!("no nodes have been changed");
            exn::bail!(ErrorKind::NoChanges);
        }

        let workspace = match &self.settings.temp_dir {
            Some(dir) => tempfile::Builder::new().prefix("publish-").tempdir_in(dir),
            None => tempfile::Builder::new().prefix("publish-").tempdir(),
        }
        .or_raise(|| ErrorKind::Io)?;
        let db_path = workspace.path().join(format!("{}.{DATABASE_EXTENSION}", channel.id));
        tracing::info!(path = %db_path.display(), "created temporary export database");

        let started_at = OffsetDateTime::now_utc();
        let db = Database::connect(&db_path).await.or_raise(|| ErrorKind::Export)?;
        let outcome = match self.export(&db, &channel, started_at, options, sink).await {
            Ok(exported) => db.stats().await.or_raise(|| ErrorKind::Export).map(|stats| (stats, exported)),
            Err(err) => Err(err),
        };
        // Checkpoints the WAL so the database file is complete on its own.
        db.close().await;
        let (stats, exported) = outcome?;
        let database_path = self.persist(&channel.id, &db_path).await?;
        workspace.close().or_raise(|| ErrorKind::Io)?;

        let published_at = OffsetDateTime::now_utc();
        let version = channel.version + 1;
        self.source
            .record_publish(PublishRecord {
                version,
                resource_count: stats.resource_count,
                kind_count: stats.kind_count.clone(),
                size: stats.size,
                date_published: published_at,
                version_notes: options.version_notes.clone(),
                included_languages: stats.languages.clone(),
            })
            .await?;
        self.source.mark_published(&exported).await?;
        if let Some(sink) = sink {
            sink.update(PublishState::Finished, 100.0);
        }
        tracing::info!(version, resources = stats.resource_count, size = stats.size, "published channel");

        Ok(ExportArtifact { channel_id: channel.id, version, database_path, stats, published_at })
    }

    /// Write every exportable node inside a single transaction, returning the
    /// source ids of the nodes that were exported.
    async fn export(
        &self,
        db: &Database,
        channel: &ChannelInfo,
        started_at: OffsetDateTime,
        options: &PublishOptions,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<Vec<String>> {
        let root = self.source.root().await?;
        let total = self.source.descendant_count(&root.id).await? + 1;
        let ProgressRange { start, end } = self.settings.progress;
        let mut progress = ProgressTracker::new(sink, start, end, total);
        progress.report(start);

        let mut writer = db.begin().await.or_raise(|| ErrorKind::Export)?;
        tracing::info!("generating channel metadata");
        writer
            .upsert_channel_metadata(&ChannelMetadataRecord {
                id: channel.id.clone(),
                name: channel.name.clone(),
                description: channel.description.clone(),
                tagline: channel.tagline.clone(),
                author: channel.author.clone(),
                version: channel.version + 1,
                thumbnail: channel.icon_encoding.clone(),
                root_id: root.node_id.clone(),
                min_schema_version: MIN_SCHEMA_VERSION.to_string(),
                last_updated: started_at.format(&Rfc3339).ok(),
            })
            .await
            .or_raise(|| ErrorKind::Export)?;

        let exporter = NodeExporter::new(channel);
        let files = FileAssociator::new(&self.source, &self.store, self.settings.thumbnail_size);
        // A node is only dequeued after its parent was exported, which keeps
        // every parent ahead of its children.
        let mut exported = Vec::new();
        let mut queue: VecDeque<(SourceNode, Option<String>)> = VecDeque::from([(root, None)]);
        while let Some((mut node, parent)) = queue.pop_front() {
            tracing::debug!(node = %node.id, "mapping node");
            let empty_topic = node.kind == ContentKind::Topic && !self.source.has_resources(&node.id).await?;
            if node.complete && !empty_topic {
                for child in self.source.children(&node.id).await? {
                    queue.push_back((child, Some(node.node_id.clone())));
                }
                let (_, extra) = exporter.export(&mut writer, &node, parent.as_deref()).await?;
                if node.kind == ContentKind::Exercise {
                    let config = exporter.export_assessment_metadata(&mut writer, &node, &extra).await?;
                    if options.force_exercises || node.changed || !node.has_exercise_archive() {
                        self.rebuild_exercise(&mut node, &config).await?;
                    }
                }
                files.associate(&mut writer, &mut node).await?;
                exporter.map_tags(&mut writer, &node).await?;
                exported.push(node.id);
            } else {
                tracing::debug!(node = %node.id, complete = node.complete, empty_topic, "skipping node");
            }
            progress.advance();
        }
        progress.report(end);

        // Tree indices are rebuilt once here rather than on every insert.
        writer.commit().await.or_raise(|| ErrorKind::Export)?;
        Ok(exported)
    }

    /// Build the node's exercise archive and make it the node's exercise file.
    #[instrument(skip_all, fields(node = %node.node_id, items = node.assessment_items.len()))]
    async fn rebuild_exercise(&self, node: &mut SourceNode, config: &ExerciseConfig) -> Result<()> {
        let archive = ExerciseArchiveBuilder::new(&self.store, &self.templates)
            .with_policy(self.settings.item_failure_policy)
            .build(config, &node.assessment_items)
            .await
            .or_raise(|| ErrorKind::Exercise(node.node_id.clone()))?;
        let blob = self.store.put(&archive, EXERCISE_EXTENSION).await.or_raise(|| ErrorKind::Storage)?;
        let file = SourceFile {
            id: stable_id(&["exercise", &node.id, &blob.checksum]),
            checksum: blob.checksum,
            file_size: blob.size,
            file_format: EXERCISE_EXTENSION.to_string(),
            preset: Preset::Exercise,
            language: None,
            original_filename: format!("{}.{EXERCISE_EXTENSION}", node.title),
        };
        self.source.replace_exercise_archive(&node.id, file.clone()).await?;
        node.files.retain(|existing| existing.preset != Preset::Exercise);
        node.files.push(file);
        tracing::debug!("created exercise archive");
        Ok(())
    }

    /// Base64 thumbnail exported with the channel metadata. Static and
    /// missing thumbnails export as an empty string.
    async fn icon_encoding(&self, channel: &ChannelInfo) -> String {
        let Some(filename) = channel.thumbnail.as_deref().filter(|t| !t.is_empty() && !t.contains("static")) else {
            return String::new();
        };
        if let Some(encoding) = channel.thumbnail_encoding.as_ref().and_then(thumbnail::base64_value) {
            return encoding;
        }
        let checksum = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let derived = match self.store.open(checksum, filename).await {
            Ok(bytes) => thumbnail::derive_encoding(&bytes, self.settings.thumbnail_size).map_err(|err| format!("{err:?}")),
            Err(err) => Err(format!("{err:?}")),
        };
        derived.unwrap_or_else(|error| {
            tracing::error!(channel = %channel.id, %error, "cannot derive channel thumbnail");
            String::new()
        })
    }

    async fn persist(&self, channel_id: &str, db_path: &Path) -> Result<PathBuf> {
        let target = self.settings.database_prefix.join(format!("{channel_id}.{DATABASE_EXTENSION}"));
        let bytes = tokio::fs::read(db_path).await.or_raise(|| ErrorKind::Io)?;
        self.backend.write(&target, &bytes).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(path = %target.display(), backend = self.backend.name(), "saved export database");
        Ok(target)
    }
}
