//! Write-once manifest backups.
//!
//! A manifest is copied into the backup root before its first rewrite and
//! the copy is never overwritten afterwards, so the backup always holds the
//! pristine file no matter how many times resolution runs.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::BackupError;

/// Result of [`BackupStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub path: PathBuf,
    /// `false` when an existing backup was reused.
    pub created: bool,
}

/// Backups laid out as `<root>/<package>/<manifest file name>.bak`.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the backup of `manifest` owned by `package` lives.
    pub fn backup_path(&self, package: &str, manifest: &Path) -> PathBuf {
        let file_name = manifest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "manifest".to_string());
        self.root.join(package).join(format!("{file_name}.bak"))
    }

    pub fn exists(&self, package: &str, manifest: &Path) -> bool {
        self.backup_path(package, manifest).is_file()
    }

    /// Copy `manifest` into the store unless a backup already exists.
    pub fn create(&self, package: &str, manifest: &Path) -> Result<BackupOutcome, BackupError> {
        if !manifest.is_file() {
            return Err(BackupError::SourceMissing(manifest.to_path_buf()));
        }

        let path = self.backup_path(package, manifest);
        if path.exists() {
            debug!(package, backup = %path.display(), "reusing existing backup");
            return Ok(BackupOutcome {
                path,
                created: false,
            });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BackupError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(manifest, &path).map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;

        info!(package, backup = %path.display(), "backup created");
        Ok(BackupOutcome {
            path,
            created: true,
        })
    }

    /// Copy the backup of `manifest` back over it.
    ///
    /// Returns `Ok(false)` when there is no backup and `no_exist_ok` is set.
    /// The backup itself is kept.
    pub fn restore(
        &self,
        package: &str,
        manifest: &Path,
        no_exist_ok: bool,
    ) -> Result<bool, BackupError> {
        let path = self.backup_path(package, manifest);
        if !path.is_file() {
            if no_exist_ok {
                debug!(package, "no backup to restore");
                return Ok(false);
            }
            return Err(BackupError::BackupMissing(path));
        }

        if let Some(parent) = manifest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| BackupError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(&path, manifest).map_err(|source| BackupError::Io {
            path: manifest.to_path_buf(),
            source,
        })?;

        info!(package, manifest = %manifest.display(), "manifest restored from backup");
        Ok(true)
    }
}

/// Restore one manifest from the backup root. See [`BackupStore::restore`].
pub fn restore_backup(
    backup_dir: &Path,
    package: &str,
    manifest: &Path,
    no_exist_ok: bool,
) -> Result<bool, BackupError> {
    BackupStore::new(backup_dir).restore(package, manifest, no_exist_ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, BackupStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("mods/modA/rom/mod_pv_db.txt");
        std::fs::create_dir_all(manifest.parent().unwrap()).unwrap();
        std::fs::write(&manifest, "pv_1.song_name=One\n").unwrap();
        let store = BackupStore::new(dir.path().join("backups"));
        (dir, store, manifest)
    }

    #[test]
    fn test_backup_path_is_per_package() {
        let store = BackupStore::new("/backups");
        let a = store.backup_path("modA", Path::new("/mods/modA/rom/mod_pv_db.txt"));
        let b = store.backup_path("modB", Path::new("/mods/modB/rom/mod_pv_db.txt"));
        assert_eq!(a, PathBuf::from("/backups/modA/mod_pv_db.txt.bak"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_create_is_write_once() {
        let (_dir, store, manifest) = setup();

        let first = store.create("modA", &manifest).unwrap();
        assert!(first.created);

        std::fs::write(&manifest, "changed\n").unwrap();
        let second = store.create("modA", &manifest).unwrap();
        assert!(!second.created);
        assert_eq!(first.path, second.path);
        assert_eq!(
            std::fs::read_to_string(&second.path).unwrap(),
            "pv_1.song_name=One\n"
        );
        let count = std::fs::read_dir(second.path.parent().unwrap()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_create_missing_source() {
        let (dir, store, _manifest) = setup();
        let result = store.create("modA", &dir.path().join("nope.txt"));
        assert!(matches!(result, Err(BackupError::SourceMissing(_))));
    }

    #[test]
    fn test_restore_round_trip() {
        let (dir, store, manifest) = setup();
        store.create("modA", &manifest).unwrap();
        std::fs::write(&manifest, "#[pvmerge] pv_1.song_name=One\n").unwrap();

        let restored = restore_backup(&dir.path().join("backups"), "modA", &manifest, false).unwrap();
        assert!(restored);
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "pv_1.song_name=One\n");
        assert!(store.exists("modA", &manifest));
    }

    #[test]
    fn test_restore_without_backup() {
        let (_dir, store, manifest) = setup();
        assert!(!store.restore("modA", &manifest, true).unwrap());
        assert!(matches!(
            store.restore("modA", &manifest, false),
            Err(BackupError::BackupMissing(_))
        ));
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "pv_1.song_name=One\n");
    }
}
