//! Path validation and content-addressed naming.
//!
//! Every path handed to a backend is relative to the storage root and must
//! not escape it. Content-addressed blobs are fanned out into two levels of
//! single-character directories so no directory grows unbounded.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Resolve a storage key into its normal form, rejecting anything that is
/// absolute, empty, contains a null byte, or climbs above the root.
///
/// `.` components and trailing separators are dropped and `..` is resolved
/// lexically, so `a/../b` is the same key as `b`.
///
/// ```
/// use std::path::Path;
/// use studio_storage::validate_path;
///
/// assert_eq!(validate_path("wrong/../databases/./c.sqlite3/").unwrap(), Path::new("databases/c.sqlite3"));
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("/srv/studio").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            // Null bytes survive `components()` on Unix but truncate paths in syscalls.
            Component::Normal(part) if part.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {},
            Component::ParentDir if resolved.pop() => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if resolved.as_os_str().is_empty() {
        exn::bail!(invalid());
    }
    Ok(resolved)
}

/// Builds the content-addressed location of a blob below `root`.
///
/// The layout is `<root>/<checksum[0]>/<checksum[1]>/<checksum><.ext>`. The
/// extension is taken from `filename` (lower-cased); when the filename has
/// none, `default_ext` is used instead. Both `"png"` and `".png"` are
/// accepted as the default.
///
/// ```
/// use std::path::Path;
/// use studio_storage::object_storage_name;
/// let path = object_storage_name("storage", "f00dcafe", "Diagram.PNG", "").unwrap();
/// assert_eq!(path, Path::new("storage/f/0/f00dcafe.png"));
/// let path = object_storage_name("storage", "f00dcafe", "f00dcafe", "perseus").unwrap();
/// assert_eq!(path, Path::new("storage/f/0/f00dcafe.perseus"));
/// ```
pub fn object_storage_name(
    root: impl AsRef<Path>,
    checksum: impl AsRef<str>,
    filename: impl AsRef<str>,
    default_ext: impl AsRef<str>,
) -> Result<PathBuf> {
    let checksum = checksum.as_ref();
    let mut chars = checksum.chars();
    let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
        exn::bail!(ErrorKind::InvalidChecksum(checksum.to_string()));
    };
    if !checksum.chars().all(|c| c.is_ascii_alphanumeric()) {
        exn::bail!(ErrorKind::InvalidChecksum(checksum.to_string()));
    }
    let ext = match Path::new(filename.as_ref()).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => ext.to_string(),
        _ => default_ext.as_ref().trim().trim_start_matches('.').to_string(),
    };
    let name = match ext.is_empty() {
        true => checksum.to_string(),
        false => format!("{checksum}.{}", ext.to_lowercase()),
    };
    validate(root.as_ref().join(first.to_string()).join(second.to_string()).join(name))
}
