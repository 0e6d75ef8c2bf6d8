//! Advisory lock on `config.lock`
//!
//! The lock sits next to `config.toml` rather than on it, so the config can
//! be replaced by rename while a [`ConfigLock`] is held. fs2 releases the
//! lock when the handle closes; dropping the value unlocks.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;


/// Wait used by writers before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const FIRST_DELAY: Duration = Duration::from_millis(10);
const MAX_DELAY: Duration = Duration::from_millis(500);
const WARN_AFTER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Config readers; any number may hold it together
    Shared,
    /// Config writers
    Exclusive,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        })
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("LOCK_BUSY: no {mode} lock on {} after {}ms", .path.display(), .waited.as_millis())]
    Busy {
        path: PathBuf,
        mode: LockMode,
        waited: Duration,
    },

    #[error("LOCK_IO_ERROR: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct ConfigLock {
    _file: File,
    path: PathBuf,
    mode: LockMode,
}

impl ConfigLock {
    pub fn shared(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(lock_path, LockMode::Shared, timeout)
    }

    pub fn exclusive(lock_path: &Path, timeout: Duration) -> Result<Self, LockError> {
        Self::acquire(lock_path, LockMode::Exclusive, timeout)
    }

    /// Polls with doubling delays until the lock is taken or `timeout`
    /// has elapsed. Missing parent directories are created.
    pub fn acquire(lock_path: &Path, mode: LockMode, timeout: Duration) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: lock_path.to_path_buf(),
            source,
        };
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(io_err)?;

        let started = Instant::now();
        let mut delay = FIRST_DELAY;
        let mut warned = false;
        loop {
            let attempt = match mode {
                // fs2, not the inherent `File::try_lock*` of newer std
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => {
                    tracing::trace!(path = %lock_path.display(), %mode, "config lock taken");
                    return Ok(Self {
                        _file: file,
                        path: lock_path.to_path_buf(),
                        mode,
                    });
                }
                Err(e) if !is_contended(&e) => return Err(io_err(e)),
                Err(_) => {}
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Busy {
                    path: lock_path.to_path_buf(),
                    mode,
                    waited,
                });
            }
            if !warned && waited >= WARN_AFTER {
                tracing::warn!("another nodelab process holds {}, waiting", lock_path.display());
                warned = true;
            }
            thread::sleep(delay.min(timeout - waited));
            delay = (delay * 2).min(MAX_DELAY);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
