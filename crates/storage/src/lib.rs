//! Blob storage for the publish pipeline.
//!
//! Two layers live here:
//! - [`StorageBackend`]: a glorified key/value store addressed by relative
//!   paths (local filesystem, or in-memory for tests).
//! - [`ContentStore`]: content-addressed naming on top of a backend. Blobs
//!   are keyed by their checksum, so storing the same bytes twice is a no-op.

pub mod backend;
mod content;
pub mod error;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::content::{ContentStore, StoredBlob, checksum};
pub use crate::path::{object_storage_name, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
