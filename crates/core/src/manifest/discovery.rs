//! Locating package manifests under the mods directory.
//!
//! Layout: `<mods_root>/<package>/**/<parent_dir>/<file_name>`. The package
//! name is the name of the top-level directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::CatalogError;

/// Which files count as manifests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestLayout {
    /// Manifest file name, compared case-insensitively.
    pub file_name: String,
    /// Required name of the manifest's parent directory.
    pub parent_dir: String,
}

impl Default for ManifestLayout {
    fn default() -> Self {
        Self {
            file_name: "mod_pv_db.txt".into(),
            parent_dir: "rom".into(),
        }
    }
}

impl ManifestLayout {
    fn matches(&self, path: &Path) -> bool {
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(&self.file_name));
        let parent_ok = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == self.parent_dir);
        name_ok && parent_ok
    }
}

/// A manifest found on disk, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredManifest {
    pub package: String,
    /// `<mods_root>/<package>`.
    pub package_root: PathBuf,
    pub path: PathBuf,
}

/// Find every manifest under `mods_root`, sorted by package then path.
///
/// A package may yield more than one manifest; catalog assembly rejects that
/// as a duplicate package.
pub fn discover_manifests(
    mods_root: &Path,
    layout: &ManifestLayout,
) -> Result<Vec<DiscoveredManifest>, CatalogError> {
    if !mods_root.is_dir() {
        return Err(CatalogError::ModsDirNotFound(mods_root.to_path_buf()));
    }
    info!(root = %mods_root.display(), "discovering manifests");

    let mut found = Vec::new();
    for package_root in sorted_children(mods_root)? {
        if !package_root.is_dir() {
            continue;
        }
        let Some(package) = package_root.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %package_root.display(), "skipping non-UTF-8 package directory");
            continue;
        };
        let package = package.to_string();

        let mut manifests = Vec::new();
        walk(&package_root, layout, &mut manifests)?;
        for path in manifests {
            debug!(package = %package, path = %path.display(), "found manifest");
            found.push(DiscoveredManifest {
                package: package.clone(),
                package_root: package_root.clone(),
                path,
            });
        }
    }

    found.sort_by(|a, b| a.package.cmp(&b.package).then_with(|| a.path.cmp(&b.path)));
    info!(count = found.len(), "manifest discovery complete");
    Ok(found)
}

fn walk(dir: &Path, layout: &ManifestLayout, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    for path in sorted_children(dir)? {
        let file_type = std::fs::symlink_metadata(&path)
            .map_err(|source| CatalogError::ScanFailed {
                path: path.clone(),
                source,
            })?
            .file_type();
        if file_type.is_dir() {
            walk(&path, layout, out)?;
        } else if file_type.is_file() && layout.matches(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let scan_err = |source| CatalogError::ScanFailed {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        children.push(entry.map_err(scan_err)?.path());
    }
    children.sort();
    Ok(children)
}
