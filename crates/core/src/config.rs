//! TOML-based configuration for pvmerge.
//!
//! Relative paths in the file are resolved against the directory that
//! contains the config file, so a config can live next to the game install
//! and refer to `mods` directly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::manifest::ManifestLayout;
use crate::policy::PackagePolicy;
use crate::priority::PriorityTable;

/// Priority given to packages that are absent from the priority order.
pub const DEFAULT_LOW_PRIORITY: i64 = 9999;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where packages and their manifests live.
    pub catalog: CatalogConfig,

    /// Package priority order.
    #[serde(default)]
    pub priority: PriorityConfig,

    /// Backup, dry-run, exemption and ignore settings.
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Directory relative paths are resolved against (not serialized).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Package discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding one sub-directory per package.
    pub mods_dir: PathBuf,

    /// Manifest file name (default `mod_pv_db.txt`).
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,

    /// Directory a manifest must sit in (default `rom`).
    #[serde(default = "default_manifest_parent")]
    pub manifest_parent: String,

    /// Optional mod loader `config.toml` whose `priority` array defines the
    /// package order.
    #[serde(default)]
    pub loader_config: Option<PathBuf>,
}

fn default_manifest_name() -> String {
    "mod_pv_db.txt".into()
}
fn default_manifest_parent() -> String {
    "rom".into()
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Package priority settings. Position in `order` is the priority; lower wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    #[serde(default)]
    pub order: Vec<String>,

    /// Priority of packages missing from `order`.
    #[serde(default = "default_priority")]
    pub default_priority: i64,
}

fn default_priority() -> i64 {
    DEFAULT_LOW_PRIORITY
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            default_priority: default_priority(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// How removal plans are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Where manifest backups are written (default `.pvmerge/backups`).
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Report planned changes without touching any file.
    #[serde(default)]
    pub dry_run: bool,

    /// Packages whose manifests are never modified (case-insensitive).
    #[serde(default)]
    pub exempt: Vec<String>,

    /// Glob patterns of packages left out of conflict scanning entirely.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".pvmerge/backups")
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            dry_run: false,
            exempt: Vec::new(),
            ignore: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** validate values -- call [`validate`](Self::validate)
    /// afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::ParseError { detail, .. } => ConfigError::ParseError {
                path: path.display().to_string(),
                detail,
            },
            other => other,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Parse a config from TOML text. Relative paths resolve against the
    /// current directory until `base_dir` is set.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: "<string>".into(),
            detail: e.to_string(),
        })
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.mods_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "catalog.mods_dir".into(),
                detail: "mods directory must not be empty".into(),
            });
        }
        if self.catalog.manifest_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "catalog.manifest_name".into(),
                detail: "manifest file name must not be empty".into(),
            });
        }
        if self.resolution.backup_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "resolution.backup_dir".into(),
                detail: "backup directory must not be empty".into(),
            });
        }

        // Duplicate names and sentinel ordering are checked by the table.
        PriorityTable::from_order(
            &self.priority.order,
            Some(&self.mods_dir()),
            self.priority.default_priority,
        )?;

        if let Some(pattern) = self.resolution.ignore.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "resolution.ignore".into(),
                detail: format!("empty ignore pattern '{pattern}'"),
            });
        }

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve `path` against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.resolve_path(&self.catalog.mods_dir)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve_path(&self.resolution.backup_dir)
    }

    pub fn manifest_layout(&self) -> ManifestLayout {
        ManifestLayout {
            file_name: self.catalog.manifest_name.clone(),
            parent_dir: self.catalog.manifest_parent.clone(),
        }
    }

    pub fn package_policy(&self) -> PackagePolicy {
        PackagePolicy::new(
            self.resolution.ignore.clone(),
            self.resolution.exempt.clone(),
        )
    }

    /// Build the priority table, reading the loader config when one is set.
    ///
    /// A loader config that cannot be read or parsed is a fatal error.
    pub fn priority_table(&self) -> Result<PriorityTable, ConfigError> {
        let mods_dir = self.mods_dir();
        match &self.catalog.loader_config {
            Some(loader) => PriorityTable::from_loader_config(
                &self.resolve_path(loader),
                Some(&mods_dir),
                self.priority.default_priority,
            ),
            None => PriorityTable::from_order(
                &self.priority.order,
                Some(&mods_dir),
                self.priority.default_priority,
            ),
        }
    }
}
