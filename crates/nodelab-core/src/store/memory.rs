use std::collections::HashMap;
use std::sync::Mutex;

use super::{Pointer, PointerKey, PointerStore};
use crate::error::Result;

/// In-process store, counts writes for assertions
#[derive(Debug, Default)]
pub struct MemoryPointerStore {
    values: Mutex<HashMap<PointerKey, Pointer>>,
    writes: Mutex<usize>,
}

impl MemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: PointerKey, pointer: Pointer) -> Self {
        self.lock_values().insert(key, pointer);
        self
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_values(&self) -> std::sync::MutexGuard<'_, HashMap<PointerKey, Pointer>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PointerStore for MemoryPointerStore {
    fn get(&self, key: PointerKey) -> Result<Pointer> {
        Ok(self.lock_values().get(&key).cloned().unwrap_or_default())
    }

    fn set(&self, key: PointerKey, pointer: Pointer) -> Result<()> {
        self.lock_values().insert(key, pointer);
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionIdentifier;

    #[test]
    fn test_defaults_to_unknown_without_counting() {
        let store = MemoryPointerStore::new();
        assert_eq!(store.get(PointerKey::Latest).unwrap(), Pointer::Unknown);
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_set_counts_writes() {
        let store = MemoryPointerStore::new()
            .with(PointerKey::Global, VersionIdentifier::new(4, 0, 0).into());
        assert_eq!(store.writes(), 0, "seeding is not a write");

        store
            .set(PointerKey::Global, VersionIdentifier::new(5, 0, 0).into())
            .unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(
            store.get(PointerKey::Global).unwrap(),
            Pointer::Known(VersionIdentifier::new(5, 0, 0))
        );
    }
}
