//! Content-addressed blobs on top of a [`StorageBackend`](crate::StorageBackend).

use crate::BackendHandle;
use crate::error::Result;
use crate::path::object_storage_name;
use md5::{Digest, Md5};
use std::path::PathBuf;
use tracing::instrument;

/// Checksum blobs are addressed by. Uploaded files arrive named by the MD5
/// of their contents, so derived blobs use the same digest to share one
/// namespace with them.
pub fn checksum(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// A blob that has been placed into the [`ContentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Hex MD5 digest of the blob.
    pub checksum: String,
    /// Size in bytes.
    pub size: u64,
    /// Location relative to the backend root.
    pub path: PathBuf,
}

/// Content-addressed view over a storage backend.
///
/// Blobs are named by checksum (see [`object_storage_name`]), which makes
/// every write idempotent: identical bytes always land on the same path, and
/// the second write is skipped entirely. Two publishes racing on the same
/// checksum therefore can't corrupt each other.
#[derive(Clone)]
pub struct ContentStore {
    backend: BackendHandle,
    root: PathBuf,
}
impl ContentStore {
    pub fn new(backend: BackendHandle, root: impl Into<PathBuf>) -> Self {
        Self { backend, root: root.into() }
    }

    /// Location of a blob given the checksum and original filename.
    pub fn path_for(&self, checksum: &str, filename: &str, default_ext: &str) -> Result<PathBuf> {
        object_storage_name(&self.root, checksum, filename, default_ext)
    }

    /// Read a blob by checksum. The extension is taken from `filename`.
    pub async fn open(&self, checksum: &str, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_for(checksum, filename, "")?;
        self.backend.read(&path).await
    }

    /// Store `data`, returning its checksum and location. Storing bytes that
    /// are already present does not write again.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn put(&self, data: &[u8], ext: &str) -> Result<StoredBlob> {
        let checksum = checksum(data);
        let path = self.path_for(&checksum, "", ext)?;
        let size = data.len() as u64;
        // A blob of the wrong size was cut short by an earlier failed write.
        if self.backend.exists(&path).await? && self.backend.size(&path).await? == size {
            tracing::debug!(%checksum, "blob already stored");
        } else {
            self.backend.write(&path, data).await?;
        }
        Ok(StoredBlob { checksum, size, path })
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, StorageBackend};
    use std::path::Path;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_put_is_content_addressed() {
        let backend = Arc::new(MockBackend::default());
        let store = ContentStore::new(backend.clone(), "storage");
        let first = store.put(b"same bytes", "png").await.unwrap();
        let second = store.put(b"same bytes", ".png").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.paths().await, vec![first.path.clone()]);
        let name = format!("{}.png", first.checksum);
        assert!(first.path.ends_with(&name));
        assert_eq!(store.open(&first.checksum, &name).await.unwrap(), b"same bytes");
    }

    #[tokio::test]
    async fn test_open_missing_blob() {
        let backend = Arc::new(MockBackend::default());
        let store = ContentStore::new(backend.clone(), "storage");
        assert!(store.open("deadbeef", "deadbeef.png").await.is_err());
        assert!(!backend.exists(Path::new("storage/d/e/deadbeef.png")).await.unwrap());
    }

    #[tokio::test]
    async fn test_derived_blobs_share_the_upload_checksum() {
        let backend = Arc::new(MockBackend::default());
        let store = ContentStore::new(backend.clone(), "storage");
        let blob = store.put(b"hello", "txt").await.unwrap();
        // Same digest an upload of these bytes is named by.
        assert_eq!(blob.checksum, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(blob.path, Path::new("storage/5/d/5d41402abc4b2a76b9719d911017c592.txt"));
        assert_eq!(checksum(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[tokio::test]
    async fn test_truncated_blob_is_rewritten() {
        let checksum = checksum(b"full archive");
        let path = format!("storage/{}/{}/{checksum}.perseus", &checksum[..1], &checksum[1..2]);
        let backend = Arc::new(MockBackend::with_files([(path, Vec::from(*b"full"))]));
        let store = ContentStore::new(backend.clone(), "storage");
        let blob = store.put(b"full archive", "perseus").await.unwrap();
        assert_eq!(backend.writes(), 1);
        assert_eq!(store.open(&blob.checksum, "x.perseus").await.unwrap(), b"full archive");
        store.put(b"full archive", "perseus").await.unwrap();
        assert_eq!(backend.writes(), 1);
    }
}
