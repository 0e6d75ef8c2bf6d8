use std::path::{Path, PathBuf};

use super::{Pointer, PointerKey, PointerStore};
use crate::config::{self, Config};
use crate::error::Result;

/// Pointers kept in `config.toml`
#[derive(Debug, Clone)]
pub struct FilePointerStore {
    path: PathBuf,
}

impl FilePointerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn field(config: &mut Config, key: PointerKey) -> &mut String {
    match key {
        PointerKey::Latest => &mut config.latest_version,
        PointerKey::Global => &mut config.global_version,
    }
}

impl PointerStore for FilePointerStore {
    fn get(&self, key: PointerKey) -> Result<Pointer> {
        let mut config = config::load(&self.path)?;
        field(&mut config, key).parse()
    }

    fn set(&self, key: PointerKey, pointer: Pointer) -> Result<()> {
        let value = pointer.to_string();
        config::update(&self.path, |config| {
            *field(config, key) = value;
            Ok(())
        })?;
        tracing::info!(pointer = %key, value = %pointer, "pointer updated");
        Ok(())
    }
}
