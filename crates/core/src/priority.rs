//! Package priority lookup.
//!
//! Winner selection only needs to turn a package name into a priority, so
//! that capability is the [`PriorityLookup`] trait; [`PriorityTable`] is the
//! configured implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::ConfigError;

/// Resolve a package name to its priority. Lower values win.
pub trait PriorityLookup {
    /// `None` when the package is unknown to this lookup.
    fn priority_of(&self, package: &str) -> Option<i64>;
}

impl PriorityLookup for HashMap<String, i64> {
    fn priority_of(&self, package: &str) -> Option<i64> {
        self.get(package).copied()
    }
}

impl<T: PriorityLookup + ?Sized> PriorityLookup for &T {
    fn priority_of(&self, package: &str) -> Option<i64> {
        (**self).priority_of(package)
    }
}

/// One row of the priority table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityEntry {
    pub priority: i64,
    /// `<mods_dir>/<name>` when the mods directory is known.
    pub root: Option<PathBuf>,
}

/// Package name → priority and root path.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: HashMap<String, PriorityEntry>,
    default_priority: i64,
}

impl PriorityTable {
    /// Build a table where each name's index in `order` is its priority.
    ///
    /// Rejects repeated names and a `default_priority` lower than any
    /// explicit priority.
    pub fn from_order(
        order: &[String],
        mods_dir: Option<&Path>,
        default_priority: i64,
    ) -> Result<Self, ConfigError> {
        let mut entries = HashMap::with_capacity(order.len());
        for (index, name) in order.iter().enumerate() {
            let priority = i64::try_from(index).map_err(|_| ConfigError::InvalidValue {
                field: "priority.order".into(),
                detail: "too many packages".into(),
            })?;
            let entry = PriorityEntry {
                priority,
                root: mods_dir.map(|d| d.join(name)),
            };
            if entries.insert(name.clone(), entry).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: "priority.order".into(),
                    detail: format!("package '{name}' is listed more than once"),
                });
            }
        }

        if let Some(max) = entries.values().map(|e| e.priority).max() {
            if default_priority < max {
                return Err(ConfigError::InvalidValue {
                    field: "priority.default_priority".into(),
                    detail: format!(
                        "default priority {default_priority} would outrank explicitly ordered packages (max {max})"
                    ),
                });
            }
        }

        debug!(count = entries.len(), default_priority, "priority table built");
        Ok(Self {
            entries,
            default_priority,
        })
    }

    /// Read the `priority` array of a mod loader `config.toml`.
    pub fn from_loader_config(
        path: &Path,
        mods_dir: Option<&Path>,
        default_priority: i64,
    ) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "reading load order from loader config");
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let value: toml::Value = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let invalid = |detail: &str| ConfigError::InvalidValue {
            field: "catalog.loader_config".into(),
            detail: format!("{}: {detail}", path.display()),
        };
        let list = match value.get("priority") {
            None => Vec::new(),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid("'priority' must only contain strings"))
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(invalid("'priority' must be an array of package names")),
        };

        Self::from_order(&list, mods_dir, default_priority).map_err(|e| match e {
            ConfigError::InvalidValue { detail, .. } => invalid(&detail),
            other => other,
        })
    }

    pub fn get(&self, package: &str) -> Option<&PriorityEntry> {
        self.entries.get(package)
    }

    /// Priority of `package`, falling back to the table's default.
    pub fn priority_or_default(&self, package: &str) -> i64 {
        self.priority_of(package).unwrap_or(self.default_priority)
    }

    pub fn default_priority(&self) -> i64 {
        self.default_priority
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PriorityLookup for PriorityTable {
    fn priority_of(&self, package: &str) -> Option<i64> {
        self.entries.get(package).map(|e| e.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_order_assigns_index_priorities() {
        let table =
            PriorityTable::from_order(&names(&["modA", "modB"]), Some(Path::new("/mods")), 9999)
                .unwrap();
        assert_eq!(table.priority_of("modA"), Some(0));
        assert_eq!(table.priority_of("modB"), Some(1));
        assert_eq!(table.priority_of("modZ"), None);
        assert_eq!(table.priority_or_default("modZ"), 9999);
        assert_eq!(
            table.get("modB").and_then(|e| e.root.clone()),
            Some(PathBuf::from("/mods/modB"))
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = PriorityTable::from_order(&names(&["modA", "modA"]), None, 9999);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_hashmap_lookup() {
        let map: HashMap<String, i64> = [("modA".to_string(), 3)].into_iter().collect();
        assert_eq!(map.priority_of("modA"), Some(3));
        assert_eq!((&map).priority_of("modB"), None);
    }

    #[test]
    fn test_loader_config_rejects_non_string_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "priority = [\"modA\", 3]\n").unwrap();
        let result = PriorityTable::from_loader_config(&path, None, 9999);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        std::fs::write(&path, "priority = \"modA\"\n").unwrap();
        let result = PriorityTable::from_loader_config(&path, None, 9999);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_loader_config_bad_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "priority = [").unwrap();
        let result = PriorityTable::from_loader_config(&path, None, 9999);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_loader_config_without_priority_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "enabled = true\n").unwrap();
        let table = PriorityTable::from_loader_config(&path, None, 9999).unwrap();
        assert!(table.is_empty());
    }
}
