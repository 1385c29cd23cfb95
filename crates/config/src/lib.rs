//! Layered configuration for publishing.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. A config file (TOML, YAML or JSON, chosen by extension); either given
//!    explicitly or `config.toml` in the user's config directory
//! 3. `STUDIO_*` environment variables, `__` separating nested keys
//!    (`STUDIO_STORAGE__ROOT` sets `storage.root`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use studio_perseus::ItemFailurePolicy;

const ENV_PREFIX: &str = "STUDIO_";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory backing the local storage backend.
    pub root: PathBuf,
    /// Prefix under which content-addressed blobs live.
    pub content_prefix: PathBuf,
    /// Prefix under which published export databases live.
    pub database_prefix: PathBuf,
}
impl Default for StorageConfig {
    fn default() -> Self {
        let root = ProjectDirs::from("", "", "studio")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self { root, content_prefix: PathBuf::from("storage"), database_prefix: PathBuf::from("databases") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// What to do with an assessment item that fails to render.
    pub item_failure_policy: ItemFailurePolicy,
    /// Longest edge, in pixels, of derived thumbnails.
    pub thumbnail_size: u32,
    pub progress: ProgressRange,
}
impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            item_failure_policy: ItemFailurePolicy::SkipAndLog,
            thumbnail_size: 128,
            progress: ProgressRange::default(),
        }
    }
}

/// Percentages between which per-node progress is reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRange {
    pub start: f64,
    pub end: f64,
}
impl Default for ProgressRange {
    fn default() -> Self {
        Self { start: 10.0, end: 90.0 }
    }
}

impl Config {
    /// Load from the default config file location (if it exists) and the
    /// environment.
    pub fn load() -> Result<Self> {
        let mut figment = Self::defaults();
        if let Some(path) = Self::default_path()
            && path.exists()
        {
            tracing::debug!(path = %path.display(), "loading configuration file");
            figment = figment.merge(Self::file_provider(&path)?);
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load from an explicit config file and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let figment = Self::defaults().merge(Self::file_provider(path)?);
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "studio").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn file_provider(path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => Figment::from(Toml::file_exact(path)),
            Some("yaml" | "yml") => Figment::from(Yaml::file_exact(path)),
            Some("json") => Figment::from(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
        Ok(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the type system can't express.
    pub fn validate(&self) -> Result<()> {
        for prefix in [&self.storage.content_prefix, &self.storage.database_prefix] {
            studio_storage::validate_path(prefix)
                .or_raise(|| ErrorKind::Invalid(format!("storage prefix {}", prefix.display())))?;
        }
        if self.publish.thumbnail_size == 0 {
            exn::bail!(ErrorKind::Invalid("thumbnail size must be positive".to_string()));
        }
        let ProgressRange { start, end } = self.publish.progress;
        if !(0.0..=100.0).contains(&start) || !(0.0..=100.0).contains(&end) || start >= end {
            exn::bail!(ErrorKind::Invalid(format!("progress range {start}..{end}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.storage.content_prefix, Path::new("storage"));
        assert_eq!(config.storage.database_prefix, Path::new("databases"));
        assert_eq!(config.publish.item_failure_policy, ItemFailurePolicy::SkipAndLog);
        assert_eq!(config.publish.thumbnail_size, 128);
    }

    #[rstest]
    #[case("config.toml", "[storage]\nroot = \"/srv/studio\"\n[publish]\nitem_failure_policy = \"abort\"\n")]
    #[case("config.yaml", "storage:\n  root: /srv/studio\npublish:\n  item_failure_policy: abort\n")]
    #[case("config.json", r#"{"storage": {"root": "/srv/studio"}, "publish": {"item_failure_policy": "abort"}}"#)]
    fn test_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = Config::load_from(jail.directory().join(name)).unwrap();
            assert_eq!(config.storage.root, Path::new("/srv/studio"));
            assert_eq!(config.storage.content_prefix, Path::new("storage"));
            assert_eq!(config.publish.item_failure_policy, ItemFailurePolicy::Abort);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[publish]\nthumbnail_size = 64\n")?;
            jail.set_env("STUDIO_PUBLISH__THUMBNAIL_SIZE", "256");
            let config = Config::load_from(jail.directory().join("config.toml")).unwrap();
            assert_eq!(config.publish.thumbnail_size, 256);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.ini", "")?;
            let err = Config::load_from(jail.directory().join("config.ini")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load_from("/nonexistent/studio.toml").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[rstest]
    #[case(ProgressRange { start: 90.0, end: 10.0 })]
    #[case(ProgressRange { start: 10.0, end: 150.0 })]
    fn test_invalid_progress_range(#[case] progress: ProgressRange) {
        let mut config = Config::default();
        config.publish.progress = progress;
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_escaping_prefix_is_rejected() {
        let mut config = Config::default();
        config.storage.database_prefix = PathBuf::from("../elsewhere");
        assert!(config.validate().is_err());
    }
}
