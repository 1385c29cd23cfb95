//! Perseus exercise archive assembly.
//!
//! An archive holds `exercise.json`, one `<assessment-id>.json` per item and
//! every image those items reference under `images/`. Entries are written in
//! a fixed order with fixed metadata (see [`ZipWriter`]), so rebuilding an
//! unchanged exercise yields the same bytes.

mod zip;

pub use self::zip::ZipWriter;
use crate::consts::GRAPHIE_DELIMITER;
use crate::error::{ErrorKind, Result};
use crate::exercise::ExerciseConfig;
use crate::item::{AssessmentItem, ItemFile, ItemFilePreset, ordered};
use crate::template::Templates;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use studio_storage::ContentStore;
use tracing::instrument;

/// What to do when a single assessment item cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemFailurePolicy {
    /// Fail the whole archive.
    #[default]
    Abort,
    /// Log the failure and leave the item out of the archive.
    SkipAndLog,
}

pub struct ExerciseArchiveBuilder<'a> {
    store: &'a ContentStore,
    templates: &'a Templates,
    policy: ItemFailurePolicy,
}
impl<'a> ExerciseArchiveBuilder<'a> {
    pub fn new(store: &'a ContentStore, templates: &'a Templates) -> Self {
        Self { store, templates, policy: ItemFailurePolicy::default() }
    }

    pub fn with_policy(mut self, policy: ItemFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the archive in memory.
    #[instrument(skip_all, fields(items = items.len(), policy = ?self.policy))]
    pub async fn build(&self, config: &ExerciseConfig, items: &[AssessmentItem]) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new();
        zip.add("exercise.json", self.templates.render_exercise(config)?.as_bytes())?;
        for item in ordered(items) {
            if let Err(err) = self.write_item(&mut zip, item).await {
                match self.policy {
                    ItemFailurePolicy::Abort => return Err(err),
                    ItemFailurePolicy::SkipAndLog => {
                        tracing::error!(assessment_id = %item.assessment_id, error = ?err, "Skipping assessment item");
                    },
                }
            }
        }
        tracing::debug!(entries = zip.len(), "Exercise archive assembled");
        zip.finish()
    }

    /// Build the archive and write it to `path`. The file is written next to
    /// its destination first and renamed into place, so `path` never holds a
    /// partial archive.
    pub async fn build_to(&self, config: &ExerciseConfig, items: &[AssessmentItem], path: &Path) -> Result<u64> {
        let bytes = self.build(config, items).await?;
        let size = bytes.len() as u64;
        let path = path.to_path_buf();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().or_raise(|| ErrorKind::Io)?,
        };
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .or_raise(|| ErrorKind::Io)?
        .or_raise(|| ErrorKind::Io)?;
        Ok(size)
    }

    /// Attached images first, then the images referenced from the item's
    /// text, then the item itself. Nothing is written unless every piece
    /// could be read and rendered.
    async fn write_item(&self, zip: &mut ZipWriter, item: &AssessmentItem) -> Result<()> {
        let mut staged = Staged::new(zip);
        for file in &item.files {
            match file.preset {
                ItemFilePreset::ExerciseImage => {
                    let name = format!("images/{}.{}", file.checksum, file.file_format);
                    if !staged.contains(&name) {
                        staged.push(name, self.read(file).await?);
                    }
                },
                ItemFilePreset::ExerciseGraphie => {
                    let svg_name = format!("images/{}.svg", file.original_filename);
                    let json_name = format!("images/{}-data.json", file.original_filename);
                    if !staged.contains(&svg_name) || !staged.contains(&json_name) {
                        let (svg, json) = split_graphie(&self.read(file).await?, &file.original_filename)?;
                        staged.push(svg_name, svg);
                        staged.push(json_name, json);
                    }
                },
                ItemFilePreset::Other => {},
            }
        }

        let rendered = self.templates.render_item(item)?;
        for embed in &rendered.embeds {
            if staged.contains(&embed.archive_name) {
                continue;
            }
            let data = self
                .store
                .open(&embed.checksum, &embed.filename)
                .await
                .or_raise(|| ErrorKind::Storage(embed.filename.clone()))?;
            staged.push(embed.archive_name.clone(), data);
        }
        staged.push(format!("{}.json", item.assessment_id), rendered.json.into_bytes());

        for (name, data) in staged.into_entries() {
            zip.add(&name, &data)?;
        }
        Ok(())
    }

    async fn read(&self, file: &ItemFile) -> Result<Vec<u8>> {
        let filename = file.storage_filename();
        self.store.open(&file.checksum, &filename).await.or_raise(|| ErrorKind::Storage(filename))
    }
}

/// Entries for one item, held back until the whole item is ready.
struct Staged<'z> {
    zip: &'z ZipWriter,
    entries: Vec<(String, Vec<u8>)>,
}
impl<'z> Staged<'z> {
    fn new(zip: &'z ZipWriter) -> Self {
        Self { zip, entries: Vec::new() }
    }

    fn contains(&self, name: &str) -> bool {
        self.zip.contains(name) || self.entries.iter().any(|(staged, _)| staged == name)
    }

    /// Names already in the archive or staged are skipped.
    fn push(&mut self, name: String, data: Vec<u8>) {
        if !self.contains(&name) {
            self.entries.push((name, data));
        }
    }

    fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

/// Split a graphie blob into its SVG body and JSON sidecar.
fn split_graphie(content: &[u8], name: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut delimiters = memchr::memmem::find_iter(content, GRAPHIE_DELIMITER);
    let Some(first) = delimiters.next() else {
        exn::bail!(ErrorKind::MalformedGraphie(name.to_string()));
    };
    let start = first + GRAPHIE_DELIMITER.len();
    let end = delimiters.find(|position| *position >= start).unwrap_or(content.len());
    Ok((content[..first].to_vec(), content[start..end].to_vec()))
}
