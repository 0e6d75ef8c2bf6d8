//! Environment isolation for tests that touch `NODELAB_*` variables

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that modify environment variables
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

const HOME_VAR: &str = "NODELAB_HOME";
const NODE_ROOT_VAR: &str = "NODELAB_NODE_ROOT";

/// Directories handed to the closure of [`with_isolated_nodelab_env`]
#[derive(Debug, Clone)]
pub struct IsolatedEnv {
    pub home: PathBuf,
    pub node_root: PathBuf,
}

impl IsolatedEnv {
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }
}

/// Runs `f` with `NODELAB_HOME` and `NODELAB_NODE_ROOT` pointing at fresh
/// temporary directories, restoring the previous values afterwards.
///
/// ```no_run
/// use nodelab_testkit::with_isolated_nodelab_env;
///
/// fn test_config_defaults() {
///     with_isolated_nodelab_env(|env| {
///         assert!(!env.config_file().exists());
///     });
/// }
/// ```
pub fn with_isolated_nodelab_env<F, R>(f: F) -> R
where
    F: FnOnce(&IsolatedEnv) -> R,
{
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let original_home = std::env::var_os(HOME_VAR);
    let original_root = std::env::var_os(NODE_ROOT_VAR);

    let base = TempDir::new().unwrap();
    let env = IsolatedEnv {
        home: base.path().join("home"),
        node_root: base.path().join("node"),
    };
    std::fs::create_dir_all(&env.home).unwrap();
    std::fs::create_dir_all(&env.node_root).unwrap();

    // SAFETY: ENV_LOCK is held for the whole mutation window.
    unsafe {
        std::env::set_var(HOME_VAR, &env.home);
        std::env::set_var(NODE_ROOT_VAR, &env.node_root);
    }

    let result = f(&env);

    // SAFETY: still holding ENV_LOCK.
    unsafe {
        restore(HOME_VAR, original_home);
        restore(NODE_ROOT_VAR, original_root);
    }

    drop(base);
    result
}

unsafe fn restore(name: &str, value: Option<std::ffi::OsString>) {
    // SAFETY: callers hold ENV_LOCK.
    unsafe {
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
    }
}

/// Writes a config file with `registry` pointing at `url`
pub fn write_registry_config(home: &Path, url: &str) {
    std::fs::create_dir_all(home).unwrap();
    std::fs::write(
        home.join("config.toml"),
        format!("registry = \"{}\"\niojs_registry = \"{}iojs/\"\n", url, url),
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_env_sets_variables() {
        with_isolated_nodelab_env(|env| {
            assert_eq!(
                std::env::var_os(HOME_VAR).map(PathBuf::from),
                Some(env.home.clone())
            );
            assert_eq!(
                std::env::var_os(NODE_ROOT_VAR).map(PathBuf::from),
                Some(env.node_root.clone())
            );
            assert!(env.node_root.is_dir());
        });
    }

    #[test]
    fn test_isolated_env_restores_variables() {
        let before_home = {
            let _g = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
            std::env::var_os(HOME_VAR)
        };

        with_isolated_nodelab_env(|_| {});

        let _g = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        assert_eq!(std::env::var_os(HOME_VAR), before_home, "NODELAB_HOME should be restored");
    }

    #[test]
    fn test_write_registry_config() {
        let temp = TempDir::new().unwrap();
        write_registry_config(temp.path(), "http://127.0.0.1:1234/");
        let content = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(content.contains("registry = \"http://127.0.0.1:1234/\""));
        assert!(content.contains("iojs_registry = \"http://127.0.0.1:1234/iojs/\""));
    }
}
