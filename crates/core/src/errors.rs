//! Error types for the pvmerge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. Configuration and catalog errors are fatal for a run; the
//! per-package [`ResolveError`] is captured by the executor and reported
//! instead of being propagated.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error in '{path}': {detail}")]
    ParseError { path: String, detail: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors raised while discovering manifests and assembling the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two manifests resolved to the same package name.
    #[error(
        "duplicate package name '{name}': '{}' and '{}' both declare it; \
         remove one of the manifests or rename the package directory",
        .first.display(),
        .second.display()
    )]
    DuplicatePackage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The mods directory is missing or is not a directory.
    #[error("mods directory not found: {}", .0.display())]
    ModsDirNotFound(PathBuf),

    /// I/O error while walking the mods directory.
    #[error("failed to scan '{}': {source}", .path.display())]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Manifest errors
// ---------------------------------------------------------------------------

/// Errors from reading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{}': {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Backup errors
// ---------------------------------------------------------------------------

/// Errors from creating or restoring manifest backups.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The manifest to back up does not exist.
    #[error("cannot back up missing file: {}", .0.display())]
    SourceMissing(PathBuf),

    /// No backup exists for the manifest being restored.
    #[error("cannot restore missing backup: {}", .0.display())]
    BackupMissing(PathBuf),

    /// Copy or directory creation failed.
    #[error("backup I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Failure while applying one package's removal plan.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("backup failed for package '{package}': {source}")]
    Backup {
        package: String,
        #[source]
        source: BackupError,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Plan errors
// ---------------------------------------------------------------------------

/// Two removal plans that do not describe the same manifest were merged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot merge plan for '{other}' into plan for '{package}'")]
    PackageMismatch { package: String, other: String },

    #[error(
        "cannot merge plans for different manifests: '{}' vs '{}'",
        .path.display(),
        .other.display()
    )]
    ManifestMismatch { path: PathBuf, other: PathBuf },
}
