//! Writing binaries into the global slot and the backup directories

use std::io;
use std::path::Path;
use thiserror::Error;

use crate::fsutil::atomic_copy;

#[derive(Debug, Error)]
pub enum SlotWriteError {
    /// Held open by a running process
    #[error("global slot is in use: {0}")]
    InUse(#[source] io::Error),

    #[error("{0}")]
    Io(#[source] io::Error),
}

impl SlotWriteError {
    pub fn classify(error: io::Error) -> Self {
        if is_in_use(&error) {
            SlotWriteError::InUse(error)
        } else {
            SlotWriteError::Io(error)
        }
    }

    /// Like [`classify`](Self::classify), but on Windows an access-denied
    /// error only counts as in use while another process has `slot` open.
    pub fn for_slot(error: io::Error, slot: &Path) -> Self {
        #[cfg(windows)]
        if error.raw_os_error() == Some(ERROR_ACCESS_DENIED) && held_open(slot) {
            return SlotWriteError::InUse(error);
        }
        #[cfg(not(windows))]
        let _ = slot;
        Self::classify(error)
    }

    pub fn into_io(self) -> io::Error {
        match self {
            SlotWriteError::InUse(e) | SlotWriteError::Io(e) => e,
        }
    }
}

#[cfg(windows)]
const ERROR_ACCESS_DENIED: i32 = 5;

/// Sharing or lock violation on Windows, `ETXTBSY` on Unix
pub fn is_in_use(error: &io::Error) -> bool {
    match error.raw_os_error() {
        #[cfg(windows)]
        Some(32 | 33) => true,
        #[cfg(unix)]
        Some(26) => true,
        _ => false,
    }
}

/// Opening without sharing fails while a running image maps the file
#[cfg(windows)]
fn held_open(path: &Path) -> bool {
    use std::os::windows::fs::OpenOptionsExt;

    match std::fs::OpenOptions::new().read(true).share_mode(0).open(path) {
        Ok(_) => false,
        Err(e) => is_in_use(&e),
    }
}

pub trait BinaryCopier {
    /// Replaces `slot` with `source`; the slot is never left truncated
    fn copy_into_slot(&self, source: &Path, slot: &Path) -> Result<(), SlotWriteError>;

    /// Plain copy used for backups
    fn copy_file(&self, source: &Path, dest: &Path) -> io::Result<()>;
}

impl<T: BinaryCopier + ?Sized> BinaryCopier for &T {
    fn copy_into_slot(&self, source: &Path, slot: &Path) -> Result<(), SlotWriteError> {
        (**self).copy_into_slot(source, slot)
    }

    fn copy_file(&self, source: &Path, dest: &Path) -> io::Result<()> {
        (**self).copy_file(source, dest)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdBinaryCopier;

impl BinaryCopier for StdBinaryCopier {
    fn copy_into_slot(&self, source: &Path, slot: &Path) -> Result<(), SlotWriteError> {
        atomic_copy(source, slot).map_err(|e| SlotWriteError::for_slot(e, slot))
    }

    fn copy_file(&self, source: &Path, dest: &Path) -> io::Result<()> {
        atomic_copy(source, dest)
    }
}
