use std::path::PathBuf;
use thiserror::Error;

use crate::version::VersionError;

#[derive(Error, Debug)]
pub enum NodelabError {
    // Version errors
    #[error("VERSION_INVALID: {0}")]
    Version(#[from] VersionError),

    // Config errors
    #[error("CONFIG_READ_ERROR: failed to read {path}: {reason}")]
    ConfigReadError { path: PathBuf, reason: String },

    #[error("CONFIG_WRITE_ERROR: failed to write {path}: {reason}")]
    ConfigWriteError { path: PathBuf, reason: String },

    #[error("CONFIG_UNKNOWN_KEY: '{0}' is not a configuration key")]
    ConfigUnknownKey(String),

    #[error("CONFIG_READ_ONLY_KEY: '{0}' is managed by nodelab and cannot be set directly")]
    ConfigReadOnlyKey(String),

    #[error("CONFIG_INVALID_VALUE: {field}: {reason}")]
    ConfigInvalidValue { field: String, reason: String },

    // Layout errors
    #[error("LAYOUT_UNRESOLVED: could not determine the {0} directory")]
    LayoutUnresolved(&'static str),

    // IO errors
    #[error("IO_ERROR: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NodelabError>;
