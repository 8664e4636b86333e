//! Type registry: field name → category classification.
//!
//! The [`TypeRegistry`] merges every `*.json` category file found in a
//! directory into one concurrent map. Files are flat JSON objects
//! (`{"learning_rate": "Hyperparameters", ...}`) and are read in file-name
//! order, so a field mapped by two files takes the category from the file
//! that sorts last.
//!
//! A registry is built once by the caller and shared (read-mostly) between
//! provenance graphs, typically behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{RegistryError, RegistryResult};

/// Category given to fields the registry does not know.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Extension of category files.
const CATEGORY_EXT: &str = "json";

/// Outcome of [`TypeRegistry::add`].
#[derive(Debug, Default)]
pub struct AddReport {
    /// Fields newly mapped to the category.
    pub added: Vec<String>,
    /// Fields left untouched because they were already mapped: `(field, existing category)`.
    pub duplicates: Vec<(String, String)>,
    /// Set when the category file could not be rewritten. The in-memory
    /// mapping still contains `added`.
    pub persist_error: Option<RegistryError>,
}

impl AddReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.persist_error.is_none()
    }
}

/// Field → category mapping loaded from a directory of category files.
pub struct TypeRegistry {
    dir: Option<PathBuf>,
    fields: DashMap<String, String>,
    /// Files skipped during [`load`](Self::load).
    load_warnings: Vec<RegistryError>,
    /// Serializes read-merge-write cycles on category files.
    persist_lock: Mutex<()>,
}

impl TypeRegistry {
    /// Create an empty, memory-only registry.
    pub fn new() -> Self {
        Self {
            dir: None,
            fields: DashMap::new(),
            load_warnings: Vec::new(),
            persist_lock: Mutex::new(()),
        }
    }

    /// Load and merge every category file in `dir` (non-recursive).
    ///
    /// A missing directory yields an empty registry that will create its
    /// files on the first [`add`](Self::add). Unreadable or malformed files
    /// are skipped and reported through [`load_warnings`](Self::load_warnings).
    pub fn load(dir: impl Into<PathBuf>) -> RegistryResult<Self> {
        let dir = dir.into();
        let mut registry = Self {
            dir: Some(dir.clone()),
            ..Self::new()
        };

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "registry directory missing, starting empty");
                return Ok(registry);
            }
            Err(e) => {
                return Err(RegistryError::Io {
                    path: dir.display().to_string(),
                    source: e,
                });
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == CATEGORY_EXT)
            })
            .collect();
        files.sort();

        for path in files {
            match read_category_file(&path) {
                Ok(mapping) => {
                    for (field, category) in mapping {
                        registry.fields.insert(field, category);
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping category file");
                    registry.load_warnings.push(err);
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            fields = registry.fields.len(),
            skipped = registry.load_warnings.len(),
            "loaded type registry"
        );
        Ok(registry)
    }

    /// Category of `field`, if registered.
    pub fn lookup(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(|r| r.value().clone())
    }

    /// Category of `field`, falling back to [`DEFAULT_CATEGORY`].
    pub fn classify(&self, field: &str) -> String {
        self.lookup(field)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    }

    /// Map `fields` to `category` and write the category file through.
    ///
    /// A field already mapped to any category keeps its mapping and is listed
    /// in [`AddReport::duplicates`]. A category that cannot be a file name is
    /// rejected before anything changes.
    pub fn add<I, S>(&self, category: &str, fields: I) -> RegistryResult<AddReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_category(category)?;
        let mut report = AddReport::default();

        for field in fields {
            let field = field.into();
            match self.fields.entry(field.clone()) {
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        field = field.as_str(),
                        category = existing.get().as_str(),
                        "field already registered, leaving unchanged"
                    );
                    report.duplicates.push((field, existing.get().clone()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(category.to_string());
                    report.added.push(field);
                }
            }
        }

        if !report.added.is_empty() {
            if let Err(err) = self.persist(category, &report.added) {
                tracing::warn!(category, error = %err, "category file not updated");
                report.persist_error = Some(err);
            }
        }

        Ok(report)
    }

    /// Read-merge-write `<dir>/<category>.json`. No-op for memory-only registries.
    fn persist(&self, category: &str, added: &[String]) -> RegistryResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let _guard = self
            .persist_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let path = dir.join(format!("{category}.{CATEGORY_EXT}"));
        let persist_error = |source: std::io::Error| RegistryError::Persist {
            path: path.display().to_string(),
            source,
        };

        // An unreadable or malformed existing file counts as "no file yet".
        let mut mapping = read_category_file(&path).unwrap_or_default();
        for field in added {
            mapping.insert(field.clone(), category.to_string());
        }

        let content = serde_json::to_string_pretty(&mapping)
            .map_err(|e| persist_error(std::io::Error::other(e)))?;
        std::fs::create_dir_all(dir).map_err(persist_error)?;
        std::fs::write(&path, content).map_err(persist_error)?;

        tracing::debug!(path = %path.display(), fields = mapping.len(), "persisted category file");
        Ok(())
    }

    /// All fields mapped to `category`.
    pub fn fields_in(&self, category: &str) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|r| r.value() == category)
            .map(|r| r.key().clone())
            .collect()
    }

    /// Inverse view: category → fields.
    pub fn list_by_category(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut by_category: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in self.fields.iter() {
            by_category
                .entry(entry.value().clone())
                .or_default()
                .insert(entry.key().clone());
        }
        by_category
    }

    /// Files skipped during load.
    pub fn load_warnings(&self) -> &[RegistryError] {
        &self.load_warnings
    }

    /// Directory backing this registry, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Category names are file stems: non-empty, no separators, no leading dot.
fn validate_category(category: &str) -> RegistryResult<()> {
    let invalid = category.trim().is_empty()
        || category.starts_with('.')
        || category.contains(['/', '\\']);
    if invalid {
        return Err(RegistryError::InvalidCategory {
            category: category.to_string(),
        });
    }
    Ok(())
}

fn read_category_file(path: &Path) -> RegistryResult<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| RegistryError::ConfigLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| RegistryError::ConfigLoad {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("dir", &self.dir)
            .field("count", &self.len())
            .field("skipped", &self.load_warnings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn load_merges_all_files() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Configuration.json",
            r#"{"learning_rate": "Hyperparameters", "batch_size": "Hyperparameters"}"#,
        );
        write(dir.path(), "Metrics.json", r#"{"TrainingAccuracy": "Metrics"}"#);
        write(dir.path(), "notes.txt", "not a category file");

        let reg = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.lookup("learning_rate").as_deref(), Some("Hyperparameters"));
        assert_eq!(reg.lookup("TrainingAccuracy").as_deref(), Some("Metrics"));
        assert!(reg.load_warnings().is_empty());
    }

    #[test]
    fn later_file_wins_on_collision() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", r#"{"epochs": "Configuration"}"#);
        write(dir.path(), "b.json", r#"{"epochs": "Hyperparameters"}"#);

        let reg = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(reg.lookup("epochs").as_deref(), Some("Hyperparameters"));
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.json", "{ this is not json");
        write(dir.path(), "nested.json", r#"{"a": {"b": "c"}}"#);
        write(dir.path(), "good.json", r#"{"optimizer": "Configuration"}"#);

        let reg = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.load_warnings().len(), 2);
        assert!(matches!(
            reg.load_warnings()[0],
            RegistryError::ConfigLoad { .. }
        ));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let reg = TypeRegistry::load(dir.path().join("absent")).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn lookup_miss_falls_back() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.lookup("unknown"), None);
        assert_eq!(reg.classify("unknown"), DEFAULT_CATEGORY);
    }

    #[test]
    fn add_persists_category_file() {
        let dir = TempDir::new().unwrap();
        let reg = TypeRegistry::load(dir.path()).unwrap();

        let report = reg.add("test_subclass", ["test_field_0"]).unwrap();
        assert_eq!(report.added, vec!["test_field_0"]);
        assert!(report.is_clean());

        let report = reg.add("test_subclass", ["test_field_1", "test_field_2"]).unwrap();
        assert_eq!(report.added.len(), 2);

        let reloaded = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(
            reloaded.fields_in("test_subclass"),
            BTreeSet::from([
                "test_field_0".to_string(),
                "test_field_1".to_string(),
                "test_field_2".to_string(),
            ])
        );

        let content = std::fs::read_to_string(dir.path().join("test_subclass.json")).unwrap();
        assert!(content.contains('\n'), "category file should be pretty-printed");
    }

    #[test]
    fn add_is_idempotent_and_reports_duplicates() {
        let dir = TempDir::new().unwrap();
        let reg = TypeRegistry::load(dir.path()).unwrap();

        reg.add("Hyperparameters", ["dropout"]).unwrap();
        let report = reg.add("Metrics", ["dropout"]).unwrap();
        assert!(report.added.is_empty());
        assert_eq!(
            report.duplicates,
            vec![("dropout".to_string(), "Hyperparameters".to_string())]
        );
        assert_eq!(reg.lookup("dropout").as_deref(), Some("Hyperparameters"));
        assert_eq!(reg.len(), 1);
        assert!(!dir.path().join("Metrics.json").exists());
    }

    #[test]
    fn add_merges_with_existing_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Metrics.json", r#"{"loss": "Metrics"}"#);
        let reg = TypeRegistry::load(dir.path()).unwrap();

        reg.add("Metrics", ["accuracy"]).unwrap();
        let reloaded = TypeRegistry::load(dir.path()).unwrap();
        assert_eq!(reloaded.fields_in("Metrics").len(), 2);
    }

    #[test]
    fn persist_failure_still_updates_memory() {
        let dir = TempDir::new().unwrap();
        // A regular file where the registry directory should be.
        let blocker = dir.path().join("registry");
        std::fs::write(&blocker, "").unwrap();
        let reg = TypeRegistry {
            dir: Some(blocker),
            ..TypeRegistry::new()
        };

        let report = reg.add("Metrics", ["accuracy"]).unwrap();
        assert_eq!(report.added, vec!["accuracy"]);
        assert!(matches!(
            report.persist_error,
            Some(RegistryError::Persist { .. })
        ));
        assert_eq!(reg.lookup("accuracy").as_deref(), Some("Metrics"));
    }

    #[test]
    fn unusable_category_names_rejected() {
        let dir = TempDir::new().unwrap();
        let reg = TypeRegistry::load(dir.path()).unwrap();

        for category in ["", "  ", "../escape", "nested/Metrics", ".hidden"] {
            assert!(
                matches!(
                    reg.add(category, ["accuracy"]),
                    Err(RegistryError::InvalidCategory { .. })
                ),
                "category {category:?}"
            );
        }
        assert!(reg.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn list_by_category_inverts_mapping() {
        let reg = TypeRegistry::new();
        reg.add("Hyperparameters", ["lr", "batch_size"]).unwrap();
        reg.add("Metrics", ["accuracy"]).unwrap();

        let by_cat = reg.list_by_category();
        assert_eq!(by_cat.len(), 2);
        assert_eq!(by_cat["Hyperparameters"].len(), 2);
        assert!(by_cat["Metrics"].contains("accuracy"));
    }
}
