//! Test utilities for nodelab
//!
//! Shared across the workspace: temporary directories under `.tmp/`,
//! environment isolation, the shared mockito server and fake node
//! artifacts.

pub mod env;
pub mod fixtures;
pub mod mock;

pub use env::{ENV_LOCK, IsolatedEnv, with_isolated_nodelab_env, write_registry_config};
pub use fixtures::{
    elf_header, fake_node_binary, install_fake_version, node_tarball, npm_zip, pe_header,
    shasums_listing,
};
pub use mock::{get_shared_mock_server, shared_mock_registry_url};

use tempfile::TempDir;

/// Creates a temporary directory within `.tmp/` of the current directory
///
/// # Panics
///
/// Panics if the current directory cannot be determined or `.tmp/` cannot
/// be created.
///
/// ```rust
/// use nodelab_testkit::temp_dir_in_workspace;
///
/// let temp = temp_dir_in_workspace();
/// std::fs::write(temp.path().join("a.txt"), "data").unwrap();
/// ```
pub fn temp_dir_in_workspace() -> TempDir {
    try_temp_dir_in_workspace().expect("Failed to create temporary directory in .tmp/")
}

/// Fallible variant of [`temp_dir_in_workspace`]
pub fn try_temp_dir_in_workspace() -> std::io::Result<TempDir> {
    let tmp_base = std::env::current_dir()?.join(".tmp");
    std::fs::create_dir_all(&tmp_base)?;
    TempDir::new_in(&tmp_base)
}
