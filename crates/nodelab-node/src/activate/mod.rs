//! Making an installed version the one behind the global slot
//!
//! [`ActivationManager::activate`] runs these stages in order:
//!
//! 1. **ResolvingCurrent** - inspect the binary currently in the slot
//! 2. **AlreadyActive** - stop without writing if it is the requested one
//! 3. **BackingUp** - copy the current binary into its version directory
//! 4. **Overwriting** - stage the requested binary and swap it into the
//!    slot, stopping running node processes once if the slot is in use
//! 5. **Done**
//!
//! The manager never touches the pointer store; [`use_version`] does the
//! bookkeeping around it.

mod copier;
mod inspect;

pub use copier::{BinaryCopier, SlotWriteError, StdBinaryCopier, is_in_use};
pub use inspect::{BinaryInspector, ExecInspector, ImageBits, image_bits};

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::platform;
use crate::process::{ProcessKiller, SystemProcessKiller};
use nodelab_core::config::consts::NODE_BINARY;
use nodelab_core::error::NodelabError;
use nodelab_core::layout::Layout;
use nodelab_core::store::{PointerKey, PointerStore};
use nodelab_core::version::{Alias, ArchSuffix, Channel, VersionIdentifier, VersionRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    AlreadyActive {
        version: VersionIdentifier,
    },
    Activated {
        version: VersionIdentifier,
        previous: Option<VersionIdentifier>,
        /// Running node processes had to be stopped
        forced_unlock: bool,
    },
}

impl Activation {
    pub fn version(&self) -> &VersionIdentifier {
        match self {
            Activation::AlreadyActive { version } | Activation::Activated { version, .. } => {
                version
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStage {
    ResolvingCurrent,
    AlreadyActive,
    BackingUp,
    Overwriting,
    Done,
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationStage::ResolvingCurrent => "resolving current",
            ActivationStage::AlreadyActive => "already active",
            ActivationStage::BackingUp => "backing up",
            ActivationStage::Overwriting => "overwriting",
            ActivationStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("ACTIVATE_NOT_INSTALLED: {version} is not installed (expected {})", .path.display())]
    NotInstalled {
        version: VersionIdentifier,
        path: PathBuf,
    },

    #[error("ACTIVATE_BACKUP_FAILED: could not back up {current} to {}: {source}", .path.display())]
    BackupFailed {
        current: VersionIdentifier,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ACTIVATE_OVERWRITE_FAILED: could not write {version} into the global slot: {source}")]
    OverwriteFailed {
        version: VersionIdentifier,
        #[source]
        source: io::Error,
    },

    #[error(
        "ACTIVATE_LOCKED: global slot still in use after stopping node processes, {version} not activated: {source}"
    )]
    LockedRetryFailed {
        version: VersionIdentifier,
        #[source]
        source: io::Error,
    },

    #[error("ACTIVATE_POINTER_UNKNOWN: the {0} version is unknown")]
    PointerUnknown(Alias),

    #[error(transparent)]
    Store(#[from] NodelabError),
}

impl ActivationError {
    /// Stage the failure belongs to; `None` for bookkeeping errors
    pub fn stage(&self) -> Option<ActivationStage> {
        match self {
            ActivationError::NotInstalled { .. } => Some(ActivationStage::ResolvingCurrent),
            ActivationError::BackupFailed { .. } => Some(ActivationStage::BackingUp),
            ActivationError::OverwriteFailed { .. } | ActivationError::LockedRetryFailed { .. } => {
                Some(ActivationStage::Overwriting)
            }
            ActivationError::PointerUnknown(_) | ActivationError::Store(_) => None,
        }
    }
}

pub trait Activator {
    fn activate(&self, version: &VersionIdentifier) -> Result<Activation, ActivationError>;
}

impl<T: Activator + ?Sized> Activator for &T {
    fn activate(&self, version: &VersionIdentifier) -> Result<Activation, ActivationError> {
        (**self).activate(version)
    }
}

pub struct ActivationManager<'a> {
    layout: Layout,
    host_is_64bit: bool,
    inspector: Box<dyn BinaryInspector + 'a>,
    copier: Box<dyn BinaryCopier + 'a>,
    killer: Box<dyn ProcessKiller + 'a>,
}

impl<'a> ActivationManager<'a> {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            host_is_64bit: platform::detect_arch().is_64bit(),
            inspector: Box::new(ExecInspector),
            copier: Box::new(StdBinaryCopier),
            killer: Box::new(SystemProcessKiller),
        }
    }

    pub fn with_inspector(mut self, inspector: impl BinaryInspector + 'a) -> Self {
        self.inspector = Box::new(inspector);
        self
    }

    pub fn with_copier(mut self, copier: impl BinaryCopier + 'a) -> Self {
        self.copier = Box::new(copier);
        self
    }

    pub fn with_killer(mut self, killer: impl ProcessKiller + 'a) -> Self {
        self.killer = Box::new(killer);
        self
    }

    pub fn with_host_64bit(mut self, host_is_64bit: bool) -> Self {
        self.host_is_64bit = host_is_64bit;
        self
    }

    /// Version in the global slot, `None` when missing or not runnable.
    ///
    /// A native image on a 64-bit host maps to the un-suffixed directory,
    /// or to `<version>-x64` when only that one is installed.
    pub fn current(&self) -> Option<VersionIdentifier> {
        let slot = self.layout.global_slot();
        let release = self.inspector.version(&slot)?;
        let channel = Channel::for_major(release.major);
        let mut current = release.with_channel(channel);

        if !self.host_is_64bit {
            return Some(current);
        }
        if self.inspector.image_arch(&slot) == Some(ImageBits::Bits32) {
            current.arch = Some(ArchSuffix::X86);
        } else if !self.layout.is_installed(&current) {
            let mut explicit = current.clone();
            explicit.arch = Some(ArchSuffix::X64);
            if self.layout.is_installed(&explicit) {
                current = explicit;
            }
        }
        Some(current)
    }

    fn back_up(&self, current: &VersionIdentifier) -> Result<(), ActivationError> {
        let dir = self.layout.version_dir(current);
        let dest = dir.join(NODE_BINARY);
        let failed = |source| ActivationError::BackupFailed {
            current: current.clone(),
            path: dest.clone(),
            source,
        };

        std::fs::create_dir_all(&dir).map_err(failed)?;
        self.copier
            .copy_file(&self.layout.global_slot(), &dest)
            .map_err(failed)?;
        tracing::debug!(%current, path = %dest.display(), "backed up global slot");
        Ok(())
    }

    /// Returns whether processes had to be stopped
    fn overwrite(&self, version: &VersionIdentifier) -> Result<bool, ActivationError> {
        let source = self.layout.version_binary(version);
        let slot = self.layout.global_slot();

        match self.copier.copy_into_slot(&source, &slot) {
            Ok(()) => Ok(false),
            Err(SlotWriteError::Io(source)) => Err(ActivationError::OverwriteFailed {
                version: version.clone(),
                source,
            }),
            Err(SlotWriteError::InUse(error)) => {
                tracing::warn!(
                    slot = %slot.display(),
                    %error,
                    "global slot is in use, stopping running {} processes",
                    NODE_BINARY
                );
                if let Err(kill_error) = self.killer.kill_all(NODE_BINARY) {
                    tracing::warn!(error = %kill_error, "could not stop node processes, retrying anyway");
                }

                self.copier
                    .copy_into_slot(&source, &slot)
                    .map_err(|e| ActivationError::LockedRetryFailed {
                        version: version.clone(),
                        source: e.into_io(),
                    })?;
                Ok(true)
            }
        }
    }
}

impl Activator for ActivationManager<'_> {
    fn activate(&self, version: &VersionIdentifier) -> Result<Activation, ActivationError> {
        if !self.layout.is_installed(version) {
            return Err(ActivationError::NotInstalled {
                version: version.clone(),
                path: self.layout.version_binary(version),
            });
        }

        tracing::debug!(stage = %ActivationStage::ResolvingCurrent, %version);
        let current = self.current();

        if current.as_ref().is_some_and(|c| c.is_same_artifact(version)) {
            tracing::debug!(stage = %ActivationStage::AlreadyActive, %version);
            return Ok(Activation::AlreadyActive {
                version: version.clone(),
            });
        }

        if let Some(current) = &current {
            tracing::debug!(stage = %ActivationStage::BackingUp, %current);
            self.back_up(current)?;
        }

        tracing::debug!(stage = %ActivationStage::Overwriting, %version);
        let forced_unlock = self.overwrite(version)?;

        tracing::info!(stage = %ActivationStage::Done, %version, forced_unlock, "activated");
        Ok(Activation::Activated {
            version: version.clone(),
            previous: current,
            forced_unlock,
        })
    }
}

/// Resolves `request`, activates it and records it as the global version
pub fn use_version(
    store: &dyn PointerStore,
    activator: &dyn Activator,
    request: &VersionRequest,
) -> Result<Activation, ActivationError> {
    let version = match request {
        VersionRequest::Exact { version, .. } => version.clone(),
        VersionRequest::Alias(alias) => store
            .get(PointerKey::from(*alias))?
            .known()
            .cloned()
            .ok_or(ActivationError::PointerUnknown(*alias))?,
    };

    let activation = activator.activate(&version)?;
    if !store.get(PointerKey::Global)?.points_to(&version) {
        store.set(PointerKey::Global, version.into())?;
    }
    Ok(activation)
}

#[cfg(test)]
mod tests;
