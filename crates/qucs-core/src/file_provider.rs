use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::{normalize_path, FileProvider, FileProviderError};

/// [`FileProvider`] serving a fixed set of files from memory.
///
/// Directories exist implicitly as ancestors of the stored files.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryFileProvider {
    pub fn new(files: HashMap<String, String>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(path, contents)| (normalize_path(Path::new(&path)), contents))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), contents.into());
    }
}

impl FileProvider for InMemoryFileProvider {
    fn read_file(&self, path: &Path) -> Result<String, FileProviderError> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| FileProviderError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_path(path)) || self.is_directory(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        let dir = normalize_path(path);
        self.files
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileProviderError> {
        let dir = normalize_path(path);
        if !self.is_directory(&dir) {
            return Err(FileProviderError::NotFound(path.to_path_buf()));
        }

        let entries: BTreeSet<PathBuf> = self
            .files
            .keys()
            .filter_map(|file| file.strip_prefix(&dir).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| dir.join(first))
            .collect();
        Ok(entries.into_iter().collect())
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FileProviderError> {
        Ok(normalize_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> InMemoryFileProvider {
        InMemoryFileProvider::new(HashMap::from([
            ("/proj/top.sch".to_string(), "top".to_string()),
            ("/proj/sub/amp.sch".to_string(), "amp".to_string()),
            ("/proj/sub/../filter.sch".to_string(), "filter".to_string()),
        ]))
    }

    #[test]
    fn test_read_and_exists() {
        let p = provider();
        assert_eq!(p.read_file(Path::new("/proj/top.sch")).unwrap(), "top");
        assert_eq!(
            p.read_file(Path::new("/proj/./sub/amp.sch")).unwrap(),
            "amp"
        );
        assert!(p.exists(Path::new("/proj/filter.sch")));
        assert!(p.is_file(Path::new("/proj/filter.sch")));
        assert!(p.is_directory(Path::new("/proj/sub")));
        assert!(!p.is_file(Path::new("/proj/sub")));
        assert!(!p.exists(Path::new("/proj/other.sch")));
        assert_eq!(
            p.read_file(Path::new("/proj/other.sch")),
            Err(FileProviderError::NotFound(PathBuf::from("/proj/other.sch")))
        );
    }

    #[test]
    fn test_list_directory() {
        let p = provider();
        assert_eq!(
            p.list_directory(Path::new("/proj")).unwrap(),
            vec![
                PathBuf::from("/proj/filter.sch"),
                PathBuf::from("/proj/sub"),
                PathBuf::from("/proj/top.sch"),
            ]
        );
        assert!(p.list_directory(Path::new("/nowhere")).is_err());
    }
}
