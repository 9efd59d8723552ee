//! Locating subcircuit schematics from the reference stored in an instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use walkdir::WalkDir;

use crate::error::ResolveError;
use crate::{absolute, FileProvider};

/// Extension of schematic documents.
pub const SCHEMATIC_EXTENSION: &str = "sch";

/// Name to path index of known schematics, keyed by file stem.
///
/// The lock is only held for a single lookup or insert, never across I/O,
/// so a background scan can fill the index while lookups go on.
#[derive(Debug, Default)]
pub struct SchematicIndex {
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl SchematicIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` under `name`, returning the path it replaced.
    pub fn insert(&self, name: impl Into<String>, path: PathBuf) -> Option<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), path)
    }

    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries, sorted by name.
    pub fn entries(&self) -> Vec<(String, PathBuf)> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Recursively add every `.sch` file below `dir`; returns how many were
    /// added. Unreadable entries are skipped.
    ///
    /// When two files share a stem the one found first is kept.
    pub fn scan(&self, dir: &Path) -> usize {
        let mut added = 0;
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_schematic(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.contains_key(stem) {
                log::debug!("Index already has '{stem}', skipping {}", path.display());
                continue;
            }
            entries.insert(stem.to_string(), path.to_path_buf());
            added += 1;
        }
        log::debug!("Indexed {added} schematics below {}", dir.display());
        added
    }
}

/// Scan `dirs` into `index` on a background thread.
pub fn spawn_scan(index: Arc<SchematicIndex>, dirs: Vec<PathBuf>) -> JoinHandle<usize> {
    std::thread::spawn(move || dirs.iter().map(|dir| index.scan(dir)).sum())
}

fn is_schematic(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SCHEMATIC_EXTENSION))
}

/// Everything before the last `.` of the file name.
pub fn base_name(reference: &str) -> &str {
    let file = Path::new(reference)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(reference);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

/// Resolves schematic references to paths.
#[derive(Clone)]
pub struct FileLocator {
    provider: Arc<dyn FileProvider>,
    index: Arc<SchematicIndex>,
}

impl FileLocator {
    pub fn new(provider: Arc<dyn FileProvider>, index: Arc<SchematicIndex>) -> Self {
        Self { provider, index }
    }

    pub fn index(&self) -> &Arc<SchematicIndex> {
        &self.index
    }

    /// Resolve `reference`, as found in an instance's file property, to a path.
    ///
    /// In order: an existing path as given; `<basename>.sch` next to
    /// `owner` when the reference has no directory part; the name index;
    /// finally the reference made absolute whether it exists or not. Only an
    /// empty reference fails.
    pub fn resolve(&self, reference: &str, owner: Option<&Path>) -> Result<PathBuf, ResolveError> {
        if reference.is_empty() {
            return Err(ResolveError::NotFound {
                reference: String::new(),
            });
        }

        let path = Path::new(reference);
        if self.provider.is_file(path) {
            let resolved = self
                .provider
                .canonicalize(path)
                .map_err(|source| ResolveError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            log::trace!("'{reference}' exists as {}", resolved.display());
            return Ok(resolved);
        }

        let base = base_name(reference);
        let bare = path
            .parent()
            .is_none_or(|parent| parent.as_os_str().is_empty());

        if bare && let Some(dir) = owner.and_then(Path::parent) {
            let local = dir.join(format!("{base}.{SCHEMATIC_EXTENSION}"));
            if self.provider.is_file(&local) {
                log::trace!("'{reference}' found next to its owner: {}", local.display());
                return Ok(local);
            }
        }

        if let Some(indexed) = self.index.lookup(base) {
            if self.provider.is_file(&indexed) {
                log::trace!("'{reference}' found in index: {}", indexed.display());
                return Ok(indexed);
            }
            log::debug!("Index entry for '{base}' is stale: {}", indexed.display());
        }

        let synthesized = absolute(path);
        log::debug!(
            "'{reference}' not found, assuming {}",
            synthesized.display()
        );
        Ok(synthesized)
    }
}

impl std::fmt::Debug for FileLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLocator")
            .field("indexed", &self.index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryFileProvider;
    use std::collections::HashMap;

    fn locator(files: &[&str]) -> FileLocator {
        let provider = InMemoryFileProvider::new(
            files
                .iter()
                .map(|f| (f.to_string(), String::new()))
                .collect::<HashMap<_, _>>(),
        );
        FileLocator::new(Arc::new(provider), Arc::new(SchematicIndex::new()))
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("amp.sch"), "amp");
        assert_eq!(base_name("/a/b/amp.v2.sch"), "amp.v2");
        assert_eq!(base_name("amp"), "amp");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_empty_reference_is_not_found() {
        let locator = locator(&[]);
        assert!(matches!(
            locator.resolve("", None),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn test_existing_path_wins() {
        let locator = locator(&["/lib/amp.sch", "/proj/amp.sch"]);
        let resolved = locator
            .resolve("/lib/amp.sch", Some(Path::new("/proj/top.sch")))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/lib/amp.sch"));
    }

    #[test]
    fn test_co_located_beats_index() {
        let locator = locator(&["/proj/top.sch", "/proj/amp.sch", "/other/amp.sch"]);
        locator
            .index()
            .insert("amp", PathBuf::from("/other/amp.sch"));

        let owner = Path::new("/proj/top.sch");
        assert_eq!(
            locator.resolve("amp.sch", Some(owner)).unwrap(),
            PathBuf::from("/proj/amp.sch")
        );
        // without an owner the index is consulted
        assert_eq!(
            locator.resolve("amp.sch", None).unwrap(),
            PathBuf::from("/other/amp.sch")
        );
    }

    #[test]
    fn test_reference_with_directory_skips_owner() {
        let locator = locator(&["/proj/amp.sch", "/other/amp.sch"]);
        locator
            .index()
            .insert("amp", PathBuf::from("/other/amp.sch"));
        let resolved = locator
            .resolve("missing/amp.sch", Some(Path::new("/proj/top.sch")))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/other/amp.sch"));
    }

    #[test]
    fn test_stale_index_falls_through_to_synthesis() {
        let locator = locator(&[]);
        locator
            .index()
            .insert("amp", PathBuf::from("/gone/amp.sch"));
        let resolved = locator.resolve("/x/y/../amp.sch", None).unwrap();
        assert_eq!(resolved, PathBuf::from("/x/amp.sch"));
    }

    #[test]
    fn test_scan_indexes_schematics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/amp.sch"), "").unwrap();
        std::fs::write(dir.path().join("a/b/filter.sch"), "").unwrap();
        std::fs::write(dir.path().join("a/b/notes.txt"), "").unwrap();

        let index = Arc::new(SchematicIndex::new());
        let handle = spawn_scan(index.clone(), vec![dir.path().to_path_buf()]);
        assert_eq!(handle.join().unwrap(), 2);

        let names: Vec<_> = index.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["amp", "filter"]);
        assert!(index.lookup("notes").is_none());
    }

    #[test]
    fn test_concurrent_lookups_during_inserts() {
        let index = Arc::new(SchematicIndex::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let index = index.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        index.insert(format!("s{t}_{i}"), PathBuf::from(format!("/p/{t}/{i}.sch")));
                    }
                })
            })
            .collect();
        let reader = {
            let index = index.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if let Some(path) = index.lookup("s0_0") {
                        assert_eq!(path, PathBuf::from("/p/0/0.sch"));
                    }
                }
            })
        };
        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(index.len(), 400);
    }
}
