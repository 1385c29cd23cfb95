//! Attaches a node's files to its export record.

use crate::error::{ErrorKind, Result};
use crate::language;
use crate::source::{ContentSource, SourceFile, SourceNode};
use crate::thumbnail::{self, ThumbnailError};
use exn::ResultExt;
use studio_export::{ExportWriter, FileRecord, LocalFileRecord, stable_id};
use studio_storage::ContentStore;
use tracing::instrument;

pub struct FileAssociator<'a> {
    source: &'a dyn ContentSource,
    store: &'a ContentStore,
    thumbnail_size: u32,
}

impl<'a> FileAssociator<'a> {
    pub fn new(source: &'a dyn ContentSource, store: &'a ContentStore, thumbnail_size: u32) -> Self {
        Self { source, store, thumbnail_size }
    }

    /// Export every eligible file of `node`. Thumbnails are replaced by their
    /// downscaled encoding where one exists or can be derived.
    #[instrument(skip_all, fields(node = %node.node_id, files = node.files.len()))]
    pub async fn associate(&self, writer: &mut ExportWriter, node: &mut SourceNode) -> Result<Vec<FileRecord>> {
        let mut records = Vec::with_capacity(node.files.len());
        for original in node.files.clone() {
            if original.preset.is_exercise_internal() {
                continue;
            }
            if let Some(code) = &original.language {
                let language = language::lookup(code)?;
                writer.get_or_create_language(&language).await.or_raise(|| ErrorKind::Export)?;
            }
            let file = match original.preset.is_thumbnail() {
                true => self.thumbnail(node, &original).await?.unwrap_or(original),
                false => original,
            };

            let local = LocalFileRecord {
                checksum: file.checksum.clone(),
                extension: file.file_format.clone(),
                file_size: file.file_size,
                available: true,
            };
            if !writer.get_or_create_local_file(&local).await.or_raise(|| ErrorKind::Export)? {
                tracing::debug!(checksum = %file.checksum, "local file already exported");
            }
            let record = FileRecord {
                id: file.id.clone(),
                checksum: file.checksum.clone(),
                node_id: node.node_id.clone(),
                preset: file.preset.as_str().to_string(),
                lang_id: file.language.clone(),
                supplementary: file.preset.is_supplementary(),
                thumbnail: file.preset.is_thumbnail(),
                priority: Some(file.preset.order()),
                extension: file.file_format.clone(),
                file_size: file.file_size,
                available: true,
            };
            writer.create_file(&record).await.or_raise(|| ErrorKind::Export)?;
            records.push(record);
        }
        Ok(records)
    }

    /// The thumbnail file to export in place of `file`, or `None` to keep
    /// the original.
    async fn thumbnail(&self, node: &mut SourceNode, file: &SourceFile) -> Result<Option<SourceFile>> {
        let encoding = match thumbnail::parse_encoding(node.thumbnail_encoding.as_deref()) {
            Ok(Some(encoding)) => encoding,
            Ok(None) => match self.derive(file).await {
                Ok(encoding) => {
                    let stored = thumbnail::encoding_json(&encoding);
                    self.source.save_thumbnail_encoding(&node.id, &stored).await?;
                    node.thumbnail_encoding = Some(stored);
                    encoding
                },
                Err(err) => {
                    tracing::error!(node = %node.id, error = ?err, "cannot derive thumbnail; keeping original file");
                    return Ok(None);
                },
            },
            Err(err) => {
                tracing::error!(node = %node.id, error = ?err, "thumbnail encoding is malformed");
                return Ok(None);
            },
        };

        let (bytes, extension) = match thumbnail::decode_data_uri(&encoding) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::error!(node = %node.id, error = ?err, "thumbnail encoding is malformed");
                return Ok(None);
            },
        };
        let blob = self.store.put(&bytes, &extension).await.or_raise(|| ErrorKind::Storage)?;
        Ok(Some(SourceFile {
            id: stable_id(&["thumbnail", &file.id, &blob.checksum]),
            checksum: blob.checksum,
            file_size: blob.size,
            file_format: extension,
            preset: file.preset,
            language: file.language.clone(),
            original_filename: file.original_filename.clone(),
        }))
    }

    async fn derive(&self, file: &SourceFile) -> thumbnail::Result<String> {
        let bytes = self
            .store
            .open(&file.checksum, &file.storage_filename())
            .await
            .or_raise(|| ThumbnailError::Derivation(format!("cannot read {}", file.storage_filename())))?;
        thumbnail::derive_encoding(&bytes, self.thumbnail_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::Preset;
    use crate::source::{Snapshot, SnapshotSource};
    use image::{ImageFormat, Rgb, RgbImage};
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Arc;
    use studio_export::Database;
    use studio_storage::backend::MockBackend;

    fn png() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(400, 300, Rgb([0, 90, 200]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn file(id: &str, checksum: &str, format: &str, preset: Preset) -> SourceFile {
        SourceFile {
            id: id.to_string(),
            checksum: checksum.to_string(),
            file_size: 10,
            file_format: format.to_string(),
            preset,
            language: None,
            original_filename: format!("{id}.{format}"),
        }
    }

    async fn fixture(files: Vec<SourceFile>) -> (SnapshotSource, SourceNode, ContentStore, Database) {
        let backend = Arc::new(MockBackend::with_files([
            ("storage/t/h/thumb.png", png()),
            ("storage/b/r/broken.png", b"not a png".to_vec()),
        ]));
        let store = ContentStore::new(backend, "storage");
        let mut node: SourceNode = serde_json::from_value(json!({
            "id": "root", "node_id": "root", "content_id": "c", "kind": "video", "title": "Video"
        }))
        .unwrap();
        node.files = files;
        let channel = serde_json::from_value(json!({"id": "channel", "name": "Channel"})).unwrap();
        let source = SnapshotSource::new(Snapshot { channel, nodes: vec![node.clone()] });
        let db = Database::connect_in_memory().await.unwrap();
        (source, node, store, db)
    }

    async fn export_root(writer: &mut ExportWriter, node: &SourceNode) {
        let record = studio_export::NodeRecord {
            id: node.node_id.clone(),
            parent_id: None,
            kind: "video".into(),
            title: node.title.clone(),
            content_id: node.content_id.clone(),
            channel_id: "channel".into(),
            author: String::new(),
            description: String::new(),
            sort_order: 0.0,
            license_id: None,
            license_name: None,
            license_description: None,
            license_owner: String::new(),
            lang_id: None,
            coach_content: false,
            options: "{}".into(),
            available: true,
        };
        writer.upsert_node(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_exercise_internal_files_are_skipped() {
        let (source, mut node, store, db) = fixture(vec![
            file("video", "vid", "mp4", Preset::HighResVideo),
            file("image", "img", "png", Preset::ExerciseImage),
            file("graphie", "gra", "graphie", Preset::ExerciseGraphie),
        ])
        .await;
        let mut writer = db.begin().await.unwrap();
        export_root(&mut writer, &node).await;
        let records = FileAssociator::new(&source, &store, 128).associate(&mut writer, &mut node).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].preset, "high_res_video");
        assert_eq!(records[0].priority, Some(1));
        assert!(!records[0].supplementary);
    }

    #[tokio::test]
    async fn test_thumbnail_is_derived_and_saved() {
        let (source, mut node, store, db) = fixture(vec![file("thumb", "thumb", "png", Preset::VideoThumbnail)]).await;
        let mut writer = db.begin().await.unwrap();
        export_root(&mut writer, &node).await;
        let records = FileAssociator::new(&source, &store, 128).associate(&mut writer, &mut node).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_ne!(records[0].checksum, "thumb");
        assert!(records[0].thumbnail);
        // The derived encoding is persisted on the node in the source.
        let saved = source.snapshot().await.nodes[0].thumbnail_encoding.clone().unwrap();
        assert_eq!(node.thumbnail_encoding.as_deref(), Some(saved.as_str()));
        assert!(thumbnail::parse_encoding(Some(&saved)).unwrap().unwrap().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_stored_encoding_is_reused() {
        let (source, mut node, store, db) = fixture(vec![file("thumb", "thumb", "png", Preset::VideoThumbnail)]).await;
        let encoding = thumbnail::derive_encoding(&png(), 32).unwrap();
        node.thumbnail_encoding = Some(thumbnail::encoding_json(&encoding));
        let mut writer = db.begin().await.unwrap();
        export_root(&mut writer, &node).await;
        let records = FileAssociator::new(&source, &store, 128).associate(&mut writer, &mut node).await.unwrap();
        let (bytes, _) = thumbnail::decode_data_uri(&encoding).unwrap();
        assert_eq!(records[0].checksum, studio_storage::checksum(&bytes));
        // Nothing written back when the stored encoding was usable.
        assert_eq!(source.snapshot().await.nodes[0].thumbnail_encoding, None);
    }

    #[rstest::rstest]
    #[case(None, "broken")]
    #[case(Some("{not json"), "thumb")]
    #[tokio::test]
    async fn test_failed_thumbnail_falls_back_to_original(#[case] stored: Option<&str>, #[case] checksum: &str) {
        let (source, mut node, store, db) = fixture(vec![file("thumb", checksum, "png", Preset::VideoThumbnail)]).await;
        node.thumbnail_encoding = stored.map(str::to_string);
        let mut writer = db.begin().await.unwrap();
        export_root(&mut writer, &node).await;
        let records = FileAssociator::new(&source, &store, 128).associate(&mut writer, &mut node).await.unwrap();
        assert_eq!(records[0].checksum, checksum);
        assert_eq!(records[0].id, "thumb");
    }

    #[tokio::test]
    async fn test_identical_checksums_share_a_local_file() {
        let (source, mut node, store, db) = fixture(vec![
            file("one", "same", "mp4", Preset::HighResVideo),
            file("two", "same", "mp4", Preset::LowResVideo),
        ])
        .await;
        node.files[1].original_filename = "renamed.mp4".into();
        let mut writer = db.begin().await.unwrap();
        export_root(&mut writer, &node).await;
        FileAssociator::new(&source, &store, 128).associate(&mut writer, &mut node).await.unwrap();
        writer.commit().await.unwrap();
        assert_eq!(db.local_files().await.unwrap().len(), 1);
        assert_eq!(db.files().await.unwrap().len(), 2);
    }
}
