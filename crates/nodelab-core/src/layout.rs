//! On-disk layout of the node root
//!
//! ```text
//! <node_root>/
//!   node[.exe]             global slot
//!   <dir_name>/node[.exe]  one directory per installed version
//!   npm.cmd, node_modules/npm
//! ```

use std::path::{Path, PathBuf};

use crate::config::{consts, Config};
use crate::error::{NodelabError, Result};
use crate::version::VersionIdentifier;

/// Directory holding `config.toml`
pub fn config_dir() -> Result<PathBuf> {
    if let Some(home) = env_path(consts::env::HOME) {
        return Ok(home);
    }
    dirs::config_dir()
        .map(|d| d.join(consts::APP_DIR_NAME))
        .ok_or(NodelabError::LayoutUnresolved("config"))
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(consts::CONFIG_FILE_NAME))
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Node root from config, then `NODELAB_NODE_ROOT`, then the data dir
    pub fn resolve(config: &Config) -> Result<Self> {
        if let Some(root) = &config.node_root {
            return Ok(Self::new(root));
        }
        if let Some(root) = env_path(consts::env::NODE_ROOT) {
            return Ok(Self::new(root));
        }
        dirs::data_dir()
            .map(|d| Self::new(d.join(consts::APP_DIR_NAME).join("node")))
            .ok_or(NodelabError::LayoutUnresolved("node root"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The shared global activation path
    pub fn global_slot(&self) -> PathBuf {
        self.root.join(consts::NODE_BINARY)
    }

    pub fn version_dir(&self, version: &VersionIdentifier) -> PathBuf {
        self.root.join(version.dir_name())
    }

    pub fn version_binary(&self, version: &VersionIdentifier) -> PathBuf {
        self.version_dir(version).join(consts::NODE_BINARY)
    }

    /// A complete artifact: the per-version binary exists and is non-empty
    pub fn is_installed(&self, version: &VersionIdentifier) -> bool {
        is_complete_binary(&self.version_binary(version))
    }

    /// Installed versions, highest first; arch variants of one release are
    /// ordered by their directory name
    pub fn installed_versions(&self) -> Result<Vec<VersionIdentifier>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(version) = name.to_str().and_then(VersionIdentifier::from_dir_name) else {
                continue;
            };
            if self.is_installed(&version) {
                versions.push(version);
            }
        }

        versions.sort_by(|a, b| b.compare(a).then_with(|| a.dir_name().cmp(&b.dir_name())));
        Ok(versions)
    }

    pub fn npm_cmd(&self) -> PathBuf {
        self.root.join("npm.cmd")
    }

    pub fn npm_shell(&self) -> PathBuf {
        self.root.join("npm")
    }

    pub fn npm_module_dir(&self) -> PathBuf {
        self.root.join("node_modules").join("npm")
    }

    pub fn npm_installed(&self) -> bool {
        self.npm_cmd().is_file() || self.npm_module_dir().is_dir()
    }
}

pub fn is_complete_binary(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
