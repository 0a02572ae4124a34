use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Raw shape of `lpc.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    workspace: WorkspaceSection,

    /// Macros predefined for every file, name to replacement text.
    #[serde(default)]
    defines: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WorkspaceSection {
    /// Import directories, searched in order for `#include`.
    #[serde(default)]
    include: Vec<PathBuf>,

    /// Simul-efun object whose functions are visible everywhere.
    #[serde(default)]
    simul_efun: Option<PathBuf>,

    /// Extensions treated as LPC source.
    #[serde(default = "default_extensions")]
    extensions: Vec<String>,
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            simul_efun: None,
            extensions: default_extensions(),
        }
    }
}

pub fn default_extensions() -> Vec<String> {
    vec!["c".to_string(), "h".to_string()]
}

/// Resolved workspace configuration. All paths are absolute or relative to
/// `root` already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub root: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub simul_efun: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub defines: Vec<(String, String)>,
}

impl WorkspaceConfig {
    pub const FILE_NAME: &'static str = "lpc.toml";

    /// Default configuration for a root without `lpc.toml`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_dirs: Vec::new(),
            simul_efun: None,
            extensions: default_extensions(),
            defines: Vec::new(),
        }
    }

    /// Load `lpc.toml` from `dir`, falling back to defaults when the file is absent.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::MissingRoot(dir.to_path_buf()));
        }
        let path = dir.join(Self::FILE_NAME);
        if !path.exists() {
            log::debug!("no {} in {}, using defaults", Self::FILE_NAME, dir.display());
            return Ok(Self::new(dir));
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(dir, &path, &text)
    }

    pub fn from_toml(root: &Path, path: &Path, text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let include_dirs = file
            .workspace
            .include
            .iter()
            .map(|dir| root.join(dir))
            .collect();
        let simul_efun = file.workspace.simul_efun.map(|p| root.join(p));

        Ok(Self {
            root: root.to_path_buf(),
            include_dirs,
            simul_efun,
            extensions: file.workspace.extensions,
            defines: file.defines.into_iter().collect(),
        })
    }

    /// Walk up from `start` to the first directory holding `lpc.toml`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(Self::FILE_NAME).is_file())
            .map(Path::to_path_buf)
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|e| e == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            [workspace]
            include = ["include", "sys"]
            simul-efun = "secure/simul_efun.c"

            [defines]
            __HOST__ = "\"localhost\""
        "#;
        let root = Path::new("/mud/lib");
        let config = WorkspaceConfig::from_toml(root, &root.join("lpc.toml"), text).unwrap();
        assert_eq!(
            config.include_dirs,
            vec![root.join("include"), root.join("sys")]
        );
        assert_eq!(config.simul_efun, Some(root.join("secure/simul_efun.c")));
        assert_eq!(config.extensions, vec!["c", "h"]);
        assert_eq!(
            config.defines,
            vec![("__HOST__".to_string(), "\"localhost\"".to_string())]
        );
    }

    #[test]
    fn test_unknown_key_is_a_parse_error() {
        let root = Path::new("/mud");
        let err = WorkspaceConfig::from_toml(root, &root.join("lpc.toml"), "[workspace]\nbogus = 1\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_without_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkspaceConfig::load(dir.path()).unwrap();
        assert_eq!(config, WorkspaceConfig::new(dir.path()));
    }

    #[test]
    fn test_find_root_walks_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lpc.toml"), "").unwrap();
        let nested = dir.path().join("d/room");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(WorkspaceConfig::find_root(&nested), Some(dir.path().to_path_buf()));
    }
}
