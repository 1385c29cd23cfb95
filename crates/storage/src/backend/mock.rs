//! In-memory backend for tests.

use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Keeps blobs in memory and counts writes, so tests can assert on exactly
/// what a publish stored. Writes below [`failing_under`](Self::failing_under)
/// fail, to exercise error paths.
///
/// ```
/// use std::path::Path;
/// use studio_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("storage/a/b/ab.png", b"\x89PNG")]);
/// assert_eq!(backend.size(Path::new("storage/a/b/ab.png")).await?, 4);
///
/// let backend = backend.failing_under("databases");
/// assert!(backend.write(Path::new("databases/c.sqlite3"), b"SQLite").await.is_err());
/// assert_eq!(backend.writes(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockBackend {
    blobs: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    failing: Option<PathBuf>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Panics on invalid paths: a broken fixture should fail the test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let blobs = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                match validate_path(&path) {
                    Ok(valid) => (valid, data.into()),
                    Err(_) => panic!("MockBackend fixture has invalid path {}", path.display()),
                }
            })
            .collect();
        Self { blobs: RwLock::new(blobs), ..Self::default() }
    }

    /// Make every write below `prefix` fail as if the backend were down.
    pub fn failing_under(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.failing = Some(prefix.into());
        self
    }

    /// Stored paths in sorted order.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.blobs.read().await.keys().cloned().collect()
    }

    /// Successful writes so far, fixtures excluded.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.blobs.read().await.contains_key(&path))
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        let path = validate_path(path)?;
        match self.blobs.read().await.get(&path) {
            Some(data) => Ok(data.len() as u64),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        match self.blobs.read().await.get(&path) {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        if self.failing.as_ref().is_some_and(|prefix| path.starts_with(prefix)) {
            exn::bail!(ErrorKind::Unavailable(self.name().to_string()));
        }
        self.blobs.write().await.insert(path, data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
