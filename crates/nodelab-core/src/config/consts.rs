//! Constants shared across the workspace

/// Environment variables
pub mod env {
    /// Overrides the directory holding `config.toml`
    pub const HOME: &str = "NODELAB_HOME";

    /// Overrides the node root when the config does not set one
    pub const NODE_ROOT: &str = "NODELAB_NODE_ROOT";
}

/// Registry defaults
pub mod registry {
    pub const NODE: &str = "https://nodejs.org/dist/";
    pub const IOJS: &str = "https://iojs.org/dist/";
}

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_LOCK_NAME: &str = "config.lock";

/// Application directory name under the OS config/data dirs
pub const APP_DIR_NAME: &str = "nodelab";

/// Persisted value of a pointer with no known version
pub const UNKNOWN: &str = "unknown";

#[cfg(windows)]
pub const NODE_BINARY: &str = "node.exe";
#[cfg(not(windows))]
pub const NODE_BINARY: &str = "node";
