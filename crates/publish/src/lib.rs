//! Publishes a channel's content tree into a distributable export.
//!
//! A publish walks the tree breadth-first from the root, writing each
//! complete node into a fresh [export database](studio_export) together with
//! its files, tags and (for exercises) assessment metadata and a rebuilt
//! [Perseus archive](studio_perseus). The finished database is copied to
//! storage as `<databases>/<channel-id>.sqlite3`.
//!
//! ```no_run
//! # async fn run() -> studio_publish::error::Result<()> {
//! use std::sync::Arc;
//! use studio_publish::{PublishLock, PublishOptions, PublishSettings, Publisher, SnapshotSource};
//! use studio_storage::backend::LocalBackend;
//!
//! let source = SnapshotSource::load("channel.json").await?;
//! let backend = Arc::new(LocalBackend::new("local", "/srv/studio").expect("storage root"));
//! let publisher = Publisher::new(source, backend, PublishSettings::default())?;
//! let artifact = publisher.publish_channel(&PublishLock::new(), &PublishOptions::default(), None).await?;
//! println!("published version {}", artifact.version);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod exporter;
pub mod files;
pub mod language;
mod lock;
pub mod preset;
pub mod progress;
mod publish;
pub mod source;
pub mod thumbnail;

pub use crate::exporter::{ExtraFields, NodeExporter};
pub use crate::files::FileAssociator;
pub use crate::lock::{PublishLock, PublishToken};
pub use crate::preset::Preset;
pub use crate::progress::{ProgressSink, PublishState};
pub use crate::publish::{ExportArtifact, PublishOptions, PublishSettings, Publisher};
pub use crate::source::{
    ChannelInfo, ContentKind, ContentSource, PublishRecord, RoleVisibility, Snapshot, SnapshotSource, SourceFile,
    SourceLicense, SourceNode,
};
