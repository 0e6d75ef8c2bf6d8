use super::*;
use crate::process::KillError;
use nodelab_core::store::{MemoryPointerStore, Pointer};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use tempfile::TempDir;

struct FakeInspector {
    version: Option<VersionIdentifier>,
    bits: Option<ImageBits>,
}

impl FakeInspector {
    fn reporting(version: Option<&str>) -> Self {
        Self {
            version: version.map(|v| VersionIdentifier::from_release_str(v).unwrap()),
            bits: None,
        }
    }
}

impl BinaryInspector for FakeInspector {
    fn version(&self, _binary: &Path) -> Option<VersionIdentifier> {
        self.version.clone()
    }

    fn image_arch(&self, _binary: &Path) -> Option<ImageBits> {
        self.bits
    }
}

#[derive(Clone, Copy)]
enum Write {
    Ok,
    InUse,
    Fail,
}

#[derive(Default)]
struct ScriptedCopier {
    script: RefCell<VecDeque<Write>>,
    slot_writes: Cell<usize>,
    backups: RefCell<Vec<PathBuf>>,
}

impl ScriptedCopier {
    fn scripted(outcomes: &[Write]) -> Self {
        Self {
            script: RefCell::new(outcomes.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn writes(&self) -> usize {
        self.slot_writes.get() + self.backups.borrow().len()
    }
}

impl BinaryCopier for ScriptedCopier {
    fn copy_into_slot(&self, _source: &Path, _slot: &Path) -> Result<(), SlotWriteError> {
        self.slot_writes.set(self.slot_writes.get() + 1);
        match self.script.borrow_mut().pop_front().unwrap_or(Write::Ok) {
            Write::Ok => Ok(()),
            Write::InUse => Err(SlotWriteError::InUse(io::Error::other("busy"))),
            Write::Fail => Err(SlotWriteError::Io(io::Error::other("disk full"))),
        }
    }

    fn copy_file(&self, _source: &Path, dest: &Path) -> io::Result<()> {
        self.backups.borrow_mut().push(dest.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
struct CountingKiller {
    calls: Cell<usize>,
    fail: bool,
}

impl ProcessKiller for CountingKiller {
    fn kill_all(&self, image: &str) -> Result<(), KillError> {
        assert_eq!(image, NODE_BINARY);
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            Err(KillError::Failed {
                code: Some(2),
                stderr: "denied".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn v(token: &str) -> VersionIdentifier {
    token.parse().unwrap()
}

fn layout_with(installed: &[&str]) -> (TempDir, Layout) {
    let temp = TempDir::new().unwrap();
    let layout = Layout::new(temp.path());
    for token in installed {
        let version = v(token);
        std::fs::create_dir_all(layout.version_dir(&version)).unwrap();
        std::fs::write(layout.version_binary(&version), token.as_bytes()).unwrap();
    }
    (temp, layout)
}

#[test]
fn test_activate_current_is_already_active_without_writes() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::default();
    let killer = CountingKiller::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(Some("v6.2.1")))
        .with_copier(&copier)
        .with_killer(&killer);

    let result = manager.activate(&v("6.2.1")).unwrap();

    assert_eq!(result, Activation::AlreadyActive { version: v("6.2.1") });
    assert_eq!(copier.writes(), 0, "no filesystem writes expected");
    assert_eq!(killer.calls.get(), 0);
}

#[test]
fn test_activate_with_unknown_current_skips_backup() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(&copier)
        .with_killer(CountingKiller::default());

    let result = manager.activate(&v("6.2.1")).unwrap();

    assert_eq!(
        result,
        Activation::Activated {
            version: v("6.2.1"),
            previous: None,
            forced_unlock: false,
        }
    );
    assert!(copier.backups.borrow().is_empty());
    assert_eq!(copier.slot_writes.get(), 1);
}

#[test]
fn test_activate_backs_up_current_into_its_directory() {
    let (temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(Some("v5.0.0")))
        .with_copier(&copier)
        .with_killer(CountingKiller::default());

    let result = manager.activate(&v("6.2.1")).unwrap();

    assert!(matches!(
        result,
        Activation::Activated { previous: Some(ref p), .. } if *p == v("5.0.0")
    ));
    assert!(temp.path().join("5.0.0").is_dir(), "backup directory created");
    assert_eq!(
        *copier.backups.borrow(),
        vec![temp.path().join("5.0.0").join(NODE_BINARY)]
    );
}

#[test]
fn test_locked_slot_kills_once_and_retries_once() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::scripted(&[Write::InUse, Write::Ok]);
    let killer = CountingKiller::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(&copier)
        .with_killer(&killer);

    let result = manager.activate(&v("6.2.1")).unwrap();

    assert!(matches!(result, Activation::Activated { forced_unlock: true, .. }));
    assert_eq!(killer.calls.get(), 1, "exactly one termination");
    assert_eq!(copier.slot_writes.get(), 2, "exactly one retry");
}

#[test]
fn test_locked_retry_failure_leaves_global_pointer() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::scripted(&[Write::InUse, Write::InUse]);
    let killer = CountingKiller::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(Some("v5.0.0")))
        .with_copier(&copier)
        .with_killer(&killer);
    let store = MemoryPointerStore::new().with(PointerKey::Global, v("5.0.0").into());

    let err = use_version(
        &store,
        &manager,
        &VersionRequest::parse("6.2.1").unwrap(),
    )
    .unwrap_err();

    assert!(matches!(err, ActivationError::LockedRetryFailed { .. }));
    assert_eq!(err.stage(), Some(ActivationStage::Overwriting));
    assert_eq!(killer.calls.get(), 1);
    assert_eq!(copier.slot_writes.get(), 2);
    assert_eq!(store.writes(), 0);
    assert_eq!(
        store.get(PointerKey::Global).unwrap(),
        Pointer::Known(v("5.0.0"))
    );
}

#[test]
fn test_kill_failure_still_retries() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::scripted(&[Write::InUse, Write::Ok]);
    let killer = CountingKiller {
        fail: true,
        ..CountingKiller::default()
    };
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(&copier)
        .with_killer(&killer);

    assert!(manager.activate(&v("6.2.1")).is_ok());
    assert_eq!(copier.slot_writes.get(), 2);
}

#[test]
fn test_other_write_error_is_overwrite_failed_without_kill() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let copier = ScriptedCopier::scripted(&[Write::Fail]);
    let killer = CountingKiller::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(&copier)
        .with_killer(&killer);

    let err = manager.activate(&v("6.2.1")).unwrap_err();

    assert!(matches!(err, ActivationError::OverwriteFailed { .. }));
    assert_eq!(killer.calls.get(), 0);
    assert_eq!(copier.slot_writes.get(), 1);
}

/// Fails every slot write with a Windows access-denied error
#[cfg(windows)]
struct DeniedCopier;

#[cfg(windows)]
impl BinaryCopier for DeniedCopier {
    fn copy_into_slot(&self, _source: &Path, slot: &Path) -> Result<(), SlotWriteError> {
        Err(SlotWriteError::for_slot(io::Error::from_raw_os_error(5), slot))
    }

    fn copy_file(&self, _source: &Path, _dest: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(windows)]
#[test]
fn test_access_denied_on_free_slot_is_overwrite_failed_without_kill() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    std::fs::write(layout.global_slot(), b"five").unwrap();
    let killer = CountingKiller::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(DeniedCopier)
        .with_killer(&killer);

    let err = manager.activate(&v("6.2.1")).unwrap_err();

    assert!(matches!(err, ActivationError::OverwriteFailed { .. }));
    assert_eq!(killer.calls.get(), 0);
}

#[test]
fn test_activate_missing_version_is_not_installed() {
    let (temp, layout) = layout_with(&[]);
    std::fs::create_dir_all(temp.path().join("7.0.0")).unwrap();
    let copier = ScriptedCopier::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(&copier);

    let err = manager.activate(&v("7.0.0")).unwrap_err();

    assert!(matches!(err, ActivationError::NotInstalled { .. }));
    assert!(err.to_string().starts_with("ACTIVATE_NOT_INSTALLED"));
    assert_eq!(copier.writes(), 0);
}

#[test]
fn test_32bit_image_on_64bit_host_is_x86() {
    let (_temp, layout) = layout_with(&["4.4.4-x86"]);
    let copier = ScriptedCopier::default();
    let inspector = FakeInspector {
        version: Some(VersionIdentifier::new(4, 4, 4)),
        bits: Some(ImageBits::Bits32),
    };
    let manager = ActivationManager::new(layout)
        .with_inspector(inspector)
        .with_copier(&copier)
        .with_host_64bit(true);

    assert_eq!(manager.current(), Some(v("4.4.4-x86")));
    let result = manager.activate(&v("4.4.4-x86")).unwrap();
    assert!(matches!(result, Activation::AlreadyActive { .. }));
    assert_eq!(copier.writes(), 0);
}

#[test]
fn test_native_slot_maps_to_explicit_x64_directory() {
    let (temp, layout) = layout_with(&["6.2.1-x64", "5.0.0"]);
    let copier = ScriptedCopier::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector {
            version: Some(VersionIdentifier::new(6, 2, 1)),
            bits: Some(ImageBits::Bits64),
        })
        .with_copier(&copier)
        .with_host_64bit(true);

    assert_eq!(manager.current(), Some(v("6.2.1-x64")));
    let again = manager.activate(&v("6.2.1-x64")).unwrap();
    assert!(matches!(again, Activation::AlreadyActive { .. }));
    assert_eq!(copier.writes(), 0);

    manager.activate(&v("5.0.0")).unwrap();
    assert_eq!(
        *copier.backups.borrow(),
        vec![temp.path().join("6.2.1-x64").join(NODE_BINARY)]
    );
    assert!(!temp.path().join("6.2.1").exists());
}

#[test]
fn test_native_slot_prefers_unsuffixed_directory() {
    let (_temp, layout) = layout_with(&["6.2.1", "6.2.1-x64"]);
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector {
            version: Some(VersionIdentifier::new(6, 2, 1)),
            bits: Some(ImageBits::Bits64),
        })
        .with_host_64bit(true);

    assert_eq!(manager.current(), Some(v("6.2.1")));
}

#[test]
fn test_32bit_host_does_not_add_suffix() {
    let (_temp, layout) = layout_with(&[]);
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector {
            version: Some(VersionIdentifier::new(4, 4, 4)),
            bits: Some(ImageBits::Bits32),
        })
        .with_host_64bit(false);

    assert_eq!(manager.current(), Some(v("4.4.4")));
}

#[test]
fn test_iojs_release_detected_as_alternate_channel() {
    let (_temp, layout) = layout_with(&["iojs:3.3.1"]);
    let copier = ScriptedCopier::default();
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(Some("v3.3.1")))
        .with_copier(&copier);

    assert_eq!(manager.current().map(|c| c.channel), Some(Channel::Alternate));
    let result = manager.activate(&v("iojs:3.3.1")).unwrap();
    assert!(matches!(result, Activation::AlreadyActive { .. }));
}

#[test]
fn test_use_version_resolves_latest_and_sets_global() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(None))
        .with_copier(ScriptedCopier::default());
    let store = MemoryPointerStore::new().with(PointerKey::Latest, v("6.2.1").into());

    let activation = use_version(&store, &manager, &VersionRequest::parse("latest").unwrap()).unwrap();

    assert_eq!(activation.version(), &v("6.2.1"));
    assert_eq!(store.get(PointerKey::Global).unwrap(), Pointer::Known(v("6.2.1")));
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_use_version_unknown_alias() {
    let (_temp, layout) = layout_with(&[]);
    let manager = ActivationManager::new(layout).with_inspector(FakeInspector::reporting(None));
    let store = MemoryPointerStore::new();

    let err = use_version(&store, &manager, &VersionRequest::parse("latest").unwrap()).unwrap_err();

    assert!(matches!(err, ActivationError::PointerUnknown(Alias::Latest)));
    assert_eq!(store.writes(), 0);
}

#[test]
fn test_use_version_already_active_repairs_pointer() {
    let (_temp, layout) = layout_with(&["6.2.1"]);
    let manager = ActivationManager::new(layout)
        .with_inspector(FakeInspector::reporting(Some("v6.2.1")))
        .with_copier(ScriptedCopier::default());
    let store = MemoryPointerStore::new();

    let activation = use_version(&store, &manager, &VersionRequest::parse("6.2.1").unwrap()).unwrap();

    assert!(matches!(activation, Activation::AlreadyActive { .. }));
    assert_eq!(store.get(PointerKey::Global).unwrap(), Pointer::Known(v("6.2.1")));
}

#[test]
fn test_std_copier_end_to_end() {
    let (temp, layout) = layout_with(&["6.2.1"]);
    std::fs::write(layout.global_slot(), b"five").unwrap();
    let manager = ActivationManager::new(layout.clone())
        .with_inspector(FakeInspector::reporting(Some("v5.0.0")))
        .with_killer(CountingKiller::default());

    manager.activate(&v("6.2.1")).unwrap();

    assert_eq!(std::fs::read(layout.global_slot()).unwrap(), b"6.2.1");
    assert_eq!(
        std::fs::read(temp.path().join("5.0.0").join(NODE_BINARY)).unwrap(),
        b"five"
    );
}
