//! Configuration management.
//!
//! [`BridgeConfig`] controls which files are accepted as packages, where
//! scratch directories are created, the default issue policy, and the name of
//! the database entry inside the container.
//!
//! ```toml
//! # ~/.config/apkg-bridge/config.toml
//! allowed_extensions = ["apkg", "colpkg"]
//! scratch_root = "/var/tmp/apkg-bridge"
//! default_policy = "strict"
//! ```

use crate::models::Policy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "apkg-bridge";

/// Database entry name of legacy v2 packages.
pub const DEFAULT_DATABASE_ENTRY: &str = "collection.anki21";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Accepted package file extensions, lowercase, without the dot.
    pub allowed_extensions: Vec<String>,
    /// Parent directory for scratch directories (`None` = system temp dir).
    pub scratch_root: Option<PathBuf>,
    /// Policy used when a caller passes `None`.
    pub default_policy: Policy,
    /// Name of the collection database entry inside the container.
    pub database_entry: String,
}

/// Configuration file structure (all keys optional).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    allowed_extensions: Option<Vec<String>>,
    scratch_root: Option<String>,
    default_policy: Option<String>,
    database_entry: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["apkg".to_string(), "colpkg".to_string()],
            scratch_root: None,
            default_policy: Policy::BestEffort,
            database_entry: DEFAULT_DATABASE_ENTRY.to_string(),
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown policy.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::operation("read_config_file", e))?;
        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| crate::Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads `apkg-bridge/config.toml` from the platform config directory.
    ///
    /// Returns defaults if the file is absent or unreadable.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };
        let path = base_dirs
            .config_dir()
            .join(CONFIG_DIR_NAME)
            .join("config.toml");
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                Self::default()
            },
        }
    }

    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();
        if let Some(extensions) = file.allowed_extensions {
            config.allowed_extensions = extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect();
        }
        if let Some(root) = file.scratch_root {
            config.scratch_root = Some(PathBuf::from(root));
        }
        if let Some(policy) = file.default_policy {
            config.default_policy = Policy::parse(&policy).ok_or_else(|| {
                crate::Error::InvalidInput(format!("unknown policy '{policy}'"))
            })?;
        }
        if let Some(entry) = file.database_entry {
            config.database_entry = entry;
        }
        Ok(config)
    }

    /// Sets the accepted extensions.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().to_lowercase())
            .collect();
        self
    }

    /// Sets the scratch root directory.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Sets the default policy.
    #[must_use]
    pub const fn with_default_policy(mut self, policy: Policy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Sets the database entry name.
    #[must_use]
    pub fn with_database_entry(mut self, entry: impl Into<String>) -> Self {
        self.database_entry = entry.into();
        self
    }

    /// Returns true if `extension` (without the dot) is accepted.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Resolves a caller-supplied policy against the configured default.
    #[must_use]
    pub fn policy(&self, requested: Option<Policy>) -> Policy {
        requested.unwrap_or(self.default_policy)
    }

    /// Creates a fresh scratch directory under the configured root.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory cannot be created.
    pub fn scratch_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("apkg-bridge-");
        match &self.scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)
            },
            None => builder.tempdir(),
        }
    }
}
