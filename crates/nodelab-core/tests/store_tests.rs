//! Integration tests for the file-backed pointer store

use nodelab_core::config::{self, ConfigKey};
use nodelab_core::store::{FilePointerStore, Pointer, PointerKey, PointerStore};
use nodelab_core::version::VersionIdentifier;
use nodelab_testkit::temp_dir_in_workspace;
use std::sync::{Arc, Barrier};
use std::thread;

/// Concurrent pointer writes must leave a parseable config behind
#[test]
fn test_concurrent_pointer_writes_no_corruption() {
    let temp = temp_dir_in_workspace();
    let path = temp.path().join("config.toml");

    const NUM_WRITERS: u64 = 8;
    let barrier = Arc::new(Barrier::new(NUM_WRITERS as usize));

    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|i| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let store = FilePointerStore::new(path);
                barrier.wait();
                for round in 0..5 {
                    let key = if round % 2 == 0 {
                        PointerKey::Latest
                    } else {
                        PointerKey::Global
                    };
                    store
                        .set(key, VersionIdentifier::new(i, round, 0).into())
                        .unwrap_or_else(|e| panic!("writer {} failed: {}", i, e));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let store = FilePointerStore::new(&path);
    assert!(matches!(store.get(PointerKey::Latest).unwrap(), Pointer::Known(_)));
    assert!(matches!(store.get(PointerKey::Global).unwrap(), Pointer::Known(_)));
}

/// Pointer writes keep user settings made through `config`
#[test]
fn test_pointer_write_preserves_settings() {
    let temp = temp_dir_in_workspace();
    let path = temp.path().join("config.toml");

    config::update(&path, |c| c.set(ConfigKey::UpdateUrl, "https://example.com/v.txt")).unwrap();

    let store = FilePointerStore::new(&path);
    store
        .set(PointerKey::Latest, "iojs:3.3.1".parse::<Pointer>().unwrap())
        .unwrap();

    let loaded = config::load(&path).unwrap();
    assert_eq!(loaded.update_url.as_deref(), Some("https://example.com/v.txt"));
    assert_eq!(loaded.latest_version, "iojs:3.3.1");
}
