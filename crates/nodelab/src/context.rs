//! Global context for CLI commands

use anyhow::Result;
use std::path::PathBuf;

use nodelab_core::config::{self, Config};
use nodelab_core::layout::{self, Layout};
use nodelab_core::store::FilePointerStore;
use nodelab_node::activate::ActivationManager;
use nodelab_node::registry::Registries;
use nodelab_node::transport::HttpTransport;

/// Settings and locations every command works from
pub struct Context {
    pub config_path: PathBuf,
    pub config: Config,
    pub layout: Layout,
    pub registries: Registries,
    pub verbose: bool,
}

impl Context {
    /// Loads the config file and resolves the node root
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The config file cannot be read or parsed
    /// - A configured registry is not a valid URL
    pub fn new(verbose: bool) -> Result<Self> {
        let config_path = layout::config_file()?;
        let config = config::load(&config_path)?;
        let layout = Layout::resolve(&config)?;
        let registries = Registries::from_config(&config)?;

        tracing::debug!(
            config = %config_path.display(),
            root = %layout.root().display(),
            "context loaded"
        );

        Ok(Self {
            config_path,
            config,
            layout,
            registries,
            verbose,
        })
    }

    pub fn store(&self) -> FilePointerStore {
        FilePointerStore::new(&self.config_path)
    }

    pub fn transport(&self) -> Result<HttpTransport> {
        Ok(HttpTransport::new()?)
    }

    pub fn activator(&self) -> ActivationManager<'static> {
        ActivationManager::new(self.layout.clone())
    }
}
