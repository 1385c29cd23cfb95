//! Where published artifacts end up.
//!
//! A publish touches storage in two ways: content-addressed blobs (node
//! files, derived thumbnails, exercise archives) through
//! [`ContentStore`](crate::ContentStore), and the finished export database
//! written once under the databases prefix. Both go through
//! [`StorageBackend`].

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Key/value blob store addressed by paths relative to the backend root.
///
/// Implementations run every path through
/// [`validate_path`](crate::validate_path) first, so a path can never
/// escape the root.
///
/// ```
/// use std::path::Path;
/// use studio_storage::{backend::StorageBackend, error::Result};
///
/// async fn published_size(backend: &dyn StorageBackend, channel_id: &str) -> Result<Option<u64>> {
///     let path = Path::new("databases").join(format!("{channel_id}.sqlite3"));
///     match backend.exists(&path).await? {
///         true => backend.size(&path).await.map(Some),
///         false => Ok(None),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Used in log output only.
    fn name(&self) -> &str;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Size in bytes of a stored blob.
    async fn size(&self, path: &Path) -> Result<u64>;

    /// Raises [`NotFound`](crate::error::ErrorKind::NotFound) for missing blobs.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or replace a blob, creating parent directories as needed.
    /// Readers never observe a partially written blob.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}
