//! Assembly of the package catalog from discovered manifests.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::errors::{CatalogError, CoreError};
use crate::manifest::{parse_manifest, DiscoveredManifest};
use crate::models::{CatalogEntry, PackageInfo};
use crate::policy::PackagePolicy;
use crate::priority::PriorityLookup;

/// Discovered manifests left after the ignore policy, one per package.
#[derive(Debug, Default)]
pub struct ManifestSelection<'a> {
    pub selected: BTreeMap<&'a str, &'a DiscoveredManifest>,
    /// Names left out by the ignore policy, in discovery order.
    pub ignored: Vec<String>,
}

/// Apply the ignore policy and reject packages with more than one manifest.
///
/// Nothing is read or written here, so callers run it before touching any
/// file.
pub fn select_manifests<'a>(
    manifests: &'a [DiscoveredManifest],
    policy: &PackagePolicy,
) -> Result<ManifestSelection<'a>, CatalogError> {
    let mut selection = ManifestSelection::default();
    for manifest in manifests {
        if policy.is_ignored(&manifest.package) {
            if !selection.ignored.contains(&manifest.package) {
                selection.ignored.push(manifest.package.clone());
            }
            continue;
        }
        if let Some(existing) = selection.selected.get(manifest.package.as_str()) {
            return Err(CatalogError::DuplicatePackage {
                name: manifest.package.clone(),
                first: existing.path.clone(),
                second: manifest.path.clone(),
            });
        }
        selection.selected.insert(&manifest.package, manifest);
    }
    Ok(selection)
}

/// All scanned packages, keyed by unique name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    packages: BTreeMap<String, PackageInfo>,
    /// Names left out by the ignore policy.
    ignored: Vec<String>,
}

impl Catalog {
    /// Build a catalog from already-parsed packages.
    ///
    /// Two packages with the same name are a configuration error: it means
    /// discovery picked up a second manifest for one package.
    pub fn from_packages(
        packages: impl IntoIterator<Item = PackageInfo>,
    ) -> Result<Self, CatalogError> {
        let mut map: BTreeMap<String, PackageInfo> = BTreeMap::new();
        for package in packages {
            if let Some(existing) = map.get(&package.name) {
                return Err(CatalogError::DuplicatePackage {
                    name: package.name.clone(),
                    first: existing.manifest_path.clone(),
                    second: package.manifest_path.clone(),
                });
            }
            map.insert(package.name.clone(), package);
        }
        Ok(Self {
            packages: map,
            ignored: Vec::new(),
        })
    }

    /// Parse every discovered manifest into a [`PackageInfo`].
    ///
    /// Ignored packages are skipped before parsing. Priorities come from
    /// `priorities`, falling back to `default_priority`. Duplicate package
    /// names are rejected before any manifest is read.
    pub fn assemble<P: PriorityLookup + ?Sized>(
        manifests: &[DiscoveredManifest],
        priorities: &P,
        default_priority: i64,
        policy: &PackagePolicy,
    ) -> Result<Self, CoreError> {
        let ManifestSelection { selected, ignored } = select_manifests(manifests, policy)?;

        let mut packages = Vec::with_capacity(selected.len());
        for (name, manifest) in selected {
            let entries = parse_manifest(&manifest.path, name)?;
            let priority = priorities.priority_of(name).unwrap_or(default_priority);
            debug!(package = name, priority, entries = entries.len(), "package loaded");
            packages.push(PackageInfo {
                name: name.to_string(),
                priority,
                root_path: manifest.package_root.clone(),
                manifest_path: manifest.path.clone(),
                entries,
            });
        }

        let mut catalog = Self::from_packages(packages)?;
        catalog.ignored = ignored;
        info!(
            packages = catalog.packages.len(),
            entries = catalog.entry_count(),
            ignored = catalog.ignored.len(),
            "catalog assembled"
        );
        Ok(catalog)
    }

    /// Packages in name order.
    pub fn packages(&self) -> impl Iterator<Item = &PackageInfo> {
        self.packages.values()
    }

    pub fn package(&self, name: &str) -> Option<&PackageInfo> {
        self.packages.get(name)
    }

    /// Every entry: packages in name order, entries in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.packages.values().flat_map(|p| p.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.packages.values().map(PackageInfo::entry_count).sum()
    }

    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl PriorityLookup for Catalog {
    fn priority_of(&self, package: &str) -> Option<i64> {
        self.packages.get(package).map(|p| p.priority)
    }
}
