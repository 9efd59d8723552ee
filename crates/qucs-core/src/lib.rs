//! Resolution of Qucs component instances to shared prototypes.
//!
//! A [`Session`] owns everything that lives for one editing session: the
//! schematic name index, the prototype registry and the parsed library cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub mod config;
pub mod connect;
pub mod error;
pub mod file_provider;
pub mod instance;
pub mod locator;
pub mod prototype;
pub mod registry;
pub mod session;

pub use config::SessionConfig;
pub use error::{ErrorKind, ResolveError};
pub use file_provider::InMemoryFileProvider;
pub use instance::{ComponentInstance, Definition, InstanceKind, KindRegistry, Param, ParamList};
pub use locator::{FileLocator, SchematicIndex};
pub use prototype::{CommonParams, ModelSection, Prototype, PrototypeBody};
pub use registry::{PrototypeRegistry, ResolveContext};
pub use session::{SchematicDocument, Session};

/// File system access used by resolution, so tests and embedders can supply
/// their own files.
pub trait FileProvider: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<String, FileProviderError>;

    fn exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path) && !self.is_directory(path)
    }

    /// Entries directly inside `path`.
    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileProviderError>;

    /// Absolute form of `path`; paths that do not exist are normalized instead.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FileProviderError>;
}

impl<T: FileProvider + ?Sized> FileProvider for Arc<T> {
    fn read_file(&self, path: &Path) -> Result<String, FileProviderError> {
        (**self).read_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        (**self).is_directory(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileProviderError> {
        (**self).list_directory(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FileProviderError> {
        (**self).canonicalize(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileProviderError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

impl FileProviderError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FileProviderError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                FileProviderError::PermissionDenied(path.to_path_buf())
            }
            _ => FileProviderError::IoError(e.to_string()),
        }
    }
}

type CanonicalCache = HashMap<PathBuf, Result<PathBuf, FileProviderError>>;

/// [`FileProvider`] over the real file system; canonicalized paths are cached.
#[derive(Clone, Default)]
pub struct DefaultFileProvider {
    canonicalize_cache: Arc<RwLock<CanonicalCache>>,
}

impl DefaultFileProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for DefaultFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache_size = self
            .canonicalize_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("DefaultFileProvider")
            .field("cache_size", &cache_size)
            .finish()
    }
}

impl FileProvider for DefaultFileProvider {
    fn read_file(&self, path: &Path) -> Result<String, FileProviderError> {
        std::fs::read_to_string(path).map_err(|e| FileProviderError::from_io(e, path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileProviderError> {
        let entries = std::fs::read_dir(path).map_err(|e| FileProviderError::from_io(e, path))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(e) => paths.push(e.path()),
                Err(e) => return Err(FileProviderError::IoError(e.to_string())),
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FileProviderError> {
        if let Some(cached) = self
            .canonicalize_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return cached.clone();
        }

        let result = path.canonicalize().or_else(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Ok(absolute(path)),
            _ => Err(FileProviderError::from_io(e, path)),
        });

        self.canonicalize_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), result.clone());

        result
    }
}

/// Normalize a path by resolving `..` and `.` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::Prefix(prefix) => {
                normalized.push(prefix.as_os_str());
            }
            std::path::Component::RootDir => {
                normalized.push("/");
            }
            std::path::Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            std::path::Component::Normal(name) => {
                normalized.push(name);
            }
            std::path::Component::CurDir => {}
        }
    }
    normalized
}

/// `path` made absolute against the working directory, then normalized.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    let base = std::env::current_dir().unwrap_or_default();
    normalize_path(&base.join(path))
}
