//! Persisted configuration (`config.toml`)
//!
//! Reads take a shared lock on the sibling `config.lock`, writes an exclusive
//! one. Writes go through a temp file in the same directory and are
//! persisted over the target, so readers never observe a partial file.

pub mod consts;
mod model;

pub use model::{Config, ConfigKey};

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::error::{NodelabError, Result};
use crate::lock::{ConfigLock, DEFAULT_LOCK_TIMEOUT};

const READ_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Loads the config at `path`; a missing file yields defaults
pub fn load(path: &Path) -> Result<Config> {
    let parent = ensure_parent_dir(path)?;
    let _lock = ConfigLock::shared(&parent.join(consts::CONFIG_LOCK_NAME), READ_LOCK_TIMEOUT)
        .map_err(|e| NodelabError::ConfigReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    read_unlocked(path)
}

/// Writes `config` to `path` atomically
pub fn save(config: &Config, path: &Path) -> Result<()> {
    update(path, |current| {
        *current = config.clone();
        Ok(())
    })
    .map(|_| ())
}

/// Read-modify-write under one exclusive lock.
///
/// Returns the config as written.
pub fn update<F>(path: &Path, apply: F) -> Result<Config>
where
    F: FnOnce(&mut Config) -> Result<()>,
{
    let parent = ensure_parent_dir(path)?;
    let _lock = ConfigLock::exclusive(&parent.join(consts::CONFIG_LOCK_NAME), DEFAULT_LOCK_TIMEOUT)
        .map_err(|e| NodelabError::ConfigWriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut config = read_unlocked(path)?;
    apply(&mut config)?;
    let config = config.normalized();

    let content = toml::to_string_pretty(&config).map_err(|e| NodelabError::ConfigWriteError {
        path: path.to_path_buf(),
        reason: format!("failed to serialize: {}", e),
    })?;
    atomic_write(&content, path, parent)?;
    tracing::debug!(path = %path.display(), "config saved");
    Ok(config)
}

fn read_unlocked(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(NodelabError::ConfigReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    let config: Config = toml::from_str(&content).map_err(|e| NodelabError::ConfigReadError {
        path: path.to_path_buf(),
        reason: format!("failed to parse: {}", e),
    })?;
    Ok(config.normalized())
}

fn ensure_parent_dir(path: &Path) -> Result<&Path> {
    let parent = path.parent().ok_or_else(|| NodelabError::ConfigWriteError {
        path: path.to_path_buf(),
        reason: "config path has no parent directory".to_string(),
    })?;
    std::fs::create_dir_all(parent).map_err(|e| NodelabError::ConfigWriteError {
        path: path.to_path_buf(),
        reason: format!("failed to create parent dir: {}", e),
    })?;
    Ok(parent)
}

fn atomic_write(content: &str, path: &Path, parent: &Path) -> Result<()> {
    let write_err = |reason: String| NodelabError::ConfigWriteError {
        path: path.to_path_buf(),
        reason,
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| write_err(format!("failed to create temp file: {}", e)))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| write_err(format!("failed to write temp file: {}", e)))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| write_err(format!("failed to sync temp file: {}", e)))?;
    temp_file
        .persist(path)
        .map_err(|e| write_err(format!("failed to persist: {}", e.error)))?;

    #[cfg(unix)]
    {
        if let Ok(dir) = std::fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
