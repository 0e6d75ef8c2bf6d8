use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::consts;
use crate::error::{NodelabError, Result};

/// config.toml schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_registry")]
    pub registry: String,
    #[serde(default = "default_iojs_registry")]
    pub iojs_registry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_root: Option<PathBuf>,
    /// Last known newest release, `unknown` until first resolved
    #[serde(default = "default_pointer")]
    pub latest_version: String,
    /// Version currently in the global slot, `unknown` until first activation
    #[serde(default = "default_pointer")]
    pub global_version: String,
    /// Manifest whose first line is `v<semver> <date>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            iojs_registry: default_iojs_registry(),
            node_root: None,
            latest_version: default_pointer(),
            global_version: default_pointer(),
            update_url: None,
        }
    }
}

fn default_registry() -> String {
    consts::registry::NODE.to_string()
}

fn default_iojs_registry() -> String {
    consts::registry::IOJS.to_string()
}

fn default_pointer() -> String {
    consts::UNKNOWN.to_string()
}

/// Names addressable through `nodelab config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Registry,
    IojsRegistry,
    NodeRoot,
    LatestVersion,
    GlobalVersion,
    UpdateUrl,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::Registry,
        ConfigKey::IojsRegistry,
        ConfigKey::NodeRoot,
        ConfigKey::LatestVersion,
        ConfigKey::GlobalVersion,
        ConfigKey::UpdateUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Registry => "registry",
            ConfigKey::IojsRegistry => "iojs_registry",
            ConfigKey::NodeRoot => "node_root",
            ConfigKey::LatestVersion => "latest_version",
            ConfigKey::GlobalVersion => "global_version",
            ConfigKey::UpdateUrl => "update_url",
        }
    }

    /// Pointers are only written by install and activation
    pub fn is_settable(self) -> bool {
        !matches!(self, ConfigKey::LatestVersion | ConfigKey::GlobalVersion)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = NodelabError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('-', "_").to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| NodelabError::ConfigUnknownKey(s.to_string()))
    }
}

impl Config {
    /// Current value of `key`; `None` for unset optional keys
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Registry => Some(self.registry.clone()),
            ConfigKey::IojsRegistry => Some(self.iojs_registry.clone()),
            ConfigKey::NodeRoot => self.node_root.as_ref().map(|p| p.display().to_string()),
            ConfigKey::LatestVersion => Some(self.latest_version.clone()),
            ConfigKey::GlobalVersion => Some(self.global_version.clone()),
            ConfigKey::UpdateUrl => self.update_url.clone(),
        }
    }

    /// Sets a user-editable key after validating the value
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        if !key.is_settable() {
            return Err(NodelabError::ConfigReadOnlyKey(key.to_string()));
        }

        let value = value.trim();
        match key {
            ConfigKey::Registry => self.registry = normalize_registry(key, value)?,
            ConfigKey::IojsRegistry => self.iojs_registry = normalize_registry(key, value)?,
            ConfigKey::NodeRoot => {
                if value.is_empty() {
                    return Err(invalid(key, "path must not be empty"));
                }
                self.node_root = Some(PathBuf::from(value));
            }
            ConfigKey::UpdateUrl => {
                require_http(key, value)?;
                self.update_url = Some(value.to_string());
            }
            ConfigKey::LatestVersion | ConfigKey::GlobalVersion => {}
        }
        Ok(())
    }

    /// Defaults for every user setting, pointers carried over
    pub fn reset(&self) -> Config {
        Config {
            latest_version: self.latest_version.clone(),
            global_version: self.global_version.clone(),
            ..Config::default()
        }
    }

    /// Ensures both registries end with `/`
    pub fn normalized(mut self) -> Config {
        for registry in [&mut self.registry, &mut self.iojs_registry] {
            if !registry.ends_with('/') {
                registry.push('/');
            }
        }
        self
    }
}

fn invalid(key: ConfigKey, reason: &str) -> NodelabError {
    NodelabError::ConfigInvalidValue {
        field: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require_http(key: ConfigKey, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(invalid(key, "must be an http:// or https:// URL"))
    }
}

fn normalize_registry(key: ConfigKey, value: &str) -> Result<String> {
    require_http(key, value)?;
    let mut registry = value.to_string();
    if !registry.ends_with('/') {
        registry.push('/');
    }
    Ok(registry)
}
