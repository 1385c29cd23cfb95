//! Filesystem backend.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use exn::ResultExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores blobs below an absolute root directory.
///
/// ```no_run
/// use studio_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/studio")?;
/// assert!(backend.root().is_absolute());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// The root is created if missing. Relative roots, and roots that exist
    /// but are not directories, are rejected.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Constructed once at startup; not worth an async constructor.
        std::fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }
}

/// Maps an I/O failure onto the storage path it happened on.
fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ErrorKind + '_ {
    move |err| match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io(err),
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(fs::try_exists(&target).await.map_err(io_error(path))?)
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        let target = self.resolve(path)?;
        Ok(fs::metadata(&target).await.map_err(io_error(path))?.len())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        Ok(fs::read(&target).await.map_err(io_error(path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        let directory = target.parent().map_or_else(|| self.root.clone(), Path::to_path_buf);
        fs::create_dir_all(&directory).await.map_err(io_error(path))?;
        let data = data.to_vec();
        // Staged next to the target so the rename never crosses filesystems.
        let staged = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut staging = tempfile::NamedTempFile::new_in(&directory)?;
            staging.write_all(&data)?;
            staging.as_file().sync_all()?;
            staging.persist(&target).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .or_raise(|| ErrorKind::Unavailable(self.name.clone()))?;
        Ok(staged.map_err(io_error(path))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_root_must_be_an_absolute_directory() {
        let (dir, _) = backend();
        assert!(LocalBackend::new("local", "relative/root").is_err());
        std::fs::write(dir.path().join("file"), b"").unwrap();
        let err = LocalBackend::new("local", dir.path().join("file")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
        let nested = dir.path().join("created/on/demand");
        assert_eq!(LocalBackend::new("local", &nested).unwrap().root(), nested);
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_blob_round_trip() {
        let (dir, backend) = backend();
        let path = Path::new("storage/a/b/ab.png");
        backend.write(path, b"\x89PNG").await.unwrap();
        assert!(dir.path().join(path).is_file());
        assert!(backend.exists(path).await.unwrap());
        assert_eq!(backend.size(path).await.unwrap(), 4);
        assert_eq!(backend.read(path).await.unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_republished_database_replaces_previous() {
        let (dir, backend) = backend();
        let path = Path::new("databases/channel.sqlite3");
        backend.write(path, b"version 1").await.unwrap();
        backend.write(path, b"version 2").await.unwrap();
        assert_eq!(backend.read(path).await.unwrap(), b"version 2");
        // No staging files left behind.
        assert_eq!(std::fs::read_dir(dir.path().join("databases")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let (_dir, backend) = backend();
        let path = Path::new("storage/d/e/deadbeef.mp4");
        assert!(!backend.exists(path).await.unwrap());
        let err = backend.read(path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if p == path));
        assert!(matches!(&*backend.size(path).await.unwrap_err(), ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_paths_cannot_escape_root() {
        let (_dir, backend) = backend();
        assert!(backend.read(Path::new("../outside")).await.is_err());
        assert!(backend.read(Path::new("storage/../../outside")).await.is_err());
        let err = backend.write(Path::new("../outside"), b"data").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }
}
