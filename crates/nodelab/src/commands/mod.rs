//! CLI command implementations

pub mod config;
pub mod install;
pub mod ls;
pub mod node_version;
pub mod uninstall;
pub mod update;
pub mod use_version;
pub mod version;
