use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use qucs_format::{VersionTriplet, FORMAT_VERSION};
use serde::{Deserialize, Serialize};

use crate::FileProvider;

/// Environment variable naming an extra library directory, searched first.
pub const LIBDIR_ENV: &str = "QUCS_LIBDIR";

/// Settings of one session, read from `qucs.toml`.
///
/// ```toml
/// format_version = "0.1.0"
/// library_dirs = ["~/.qucs/user_lib", "/usr/share/qucs/library"]
/// project_dirs = ["~/projects/amp_prj"]
///
/// [netlist]
/// dialect = "verilog"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Newest document version this session accepts.
    pub format_version: VersionTriplet,

    /// Searched in order for `<name>.lib`.
    pub library_dirs: Vec<PathBuf>,

    /// Scanned for `.sch` files to fill the schematic name index.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_dirs: Vec<PathBuf>,

    pub netlist: NetlistConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistConfig {
    /// `qucs`, `vhdl` or `verilog`.
    pub dialect: String,
}

impl Default for NetlistConfig {
    fn default() -> Self {
        Self {
            dialect: "qucs".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            library_dirs: dirs::home_dir()
                .map(|home| vec![home.join(".qucs").join("user_lib")])
                .unwrap_or_default(),
            project_dirs: Vec::new(),
            netlist: NetlistConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: SessionConfig =
            toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse qucs.toml: {e}"))?;
        config.expand_home();
        Ok(config)
    }

    pub fn from_file(file_provider: &dyn FileProvider, path: &Path) -> Result<Self> {
        let content = file_provider
            .read_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Prepend the directory named by `QUCS_LIBDIR`, when set.
    pub fn with_env(self) -> Self {
        self.with_libdir(std::env::var_os(LIBDIR_ENV).map(PathBuf::from))
    }

    fn with_libdir(mut self, libdir: Option<PathBuf>) -> Self {
        if let Some(dir) = libdir.filter(|d| !d.as_os_str().is_empty()) {
            let dir = expand_home(&dir);
            self.library_dirs.retain(|d| d != &dir);
            self.library_dirs.insert(0, dir);
        }
        self
    }

    pub fn running_version(&self) -> VersionTriplet {
        self.format_version
    }

    fn expand_home(&mut self) {
        for dir in self.library_dirs.iter_mut().chain(self.project_dirs.iter_mut()) {
            *dir = expand_home(dir);
        }
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryFileProvider;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full() {
        let config = SessionConfig::parse(
            r#"
format_version = "0.0.19"
library_dirs = ["/usr/share/qucs/library"]
project_dirs = ["/home/me/amp_prj"]

[netlist]
dialect = "vhdl"
"#,
        )
        .unwrap();
        assert_eq!(config.format_version, VersionTriplet::new(0, 0, 19));
        assert_eq!(
            config.library_dirs,
            vec![PathBuf::from("/usr/share/qucs/library")]
        );
        assert_eq!(config.project_dirs, vec![PathBuf::from("/home/me/amp_prj")]);
        assert_eq!(config.netlist.dialect, "vhdl");
    }

    #[test]
    fn test_parse_defaults() {
        let config = SessionConfig::parse("").unwrap();
        assert_eq!(config.format_version, FORMAT_VERSION);
        assert_eq!(config.netlist.dialect, "qucs");
        assert!(config.project_dirs.is_empty());
    }

    #[test]
    fn test_rejects_malformed_version() {
        let err = SessionConfig::parse(r#"format_version = "1.0""#).unwrap_err();
        assert!(err.to_string().contains("malformed version '1.0'"));
    }

    #[test]
    fn test_from_file_reports_path() {
        let provider = InMemoryFileProvider::new(HashMap::new());
        let err = SessionConfig::from_file(&provider, Path::new("/etc/qucs.toml")).unwrap_err();
        assert!(err.to_string().contains("/etc/qucs.toml"));
    }

    #[test]
    fn test_libdir_is_prepended_once() {
        let config = SessionConfig {
            library_dirs: vec![PathBuf::from("/a"), PathBuf::from("/b")],
            ..SessionConfig::default()
        };
        let config = config.with_libdir(Some(PathBuf::from("/b")));
        assert_eq!(
            config.library_dirs,
            vec![PathBuf::from("/b"), PathBuf::from("/a")]
        );
        let unchanged = config.clone().with_libdir(Some(PathBuf::new()));
        assert_eq!(unchanged, config);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs/dir")), PathBuf::from("/abs/dir"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/lib")), home.join("lib"));
        }
    }
}
