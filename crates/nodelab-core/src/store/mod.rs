//! Persisted `latest` / `global` pointers
//!
//! The orchestrator writes the latest pointer, activation callers write the
//! global pointer. Both go through [`PointerStore`] so tests can swap in
//! [`MemoryPointerStore`].

mod file;
mod memory;

pub use file::FilePointerStore;
pub use memory::MemoryPointerStore;

use std::fmt;
use std::str::FromStr;

use crate::config::consts::UNKNOWN;
use crate::error::{NodelabError, Result};
use crate::version::{Alias, VersionIdentifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKey {
    Latest,
    Global,
}

impl PointerKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PointerKey::Latest => "latest_version",
            PointerKey::Global => "global_version",
        }
    }
}

impl From<Alias> for PointerKey {
    fn from(alias: Alias) -> Self {
        match alias {
            Alias::Latest => PointerKey::Latest,
            Alias::Global => PointerKey::Global,
        }
    }
}

impl fmt::Display for PointerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored pointer value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Pointer {
    Known(VersionIdentifier),
    #[default]
    Unknown,
}

impl Pointer {
    pub fn known(&self) -> Option<&VersionIdentifier> {
        match self {
            Pointer::Known(v) => Some(v),
            Pointer::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Pointer::Unknown)
    }

    /// `true` when known and identical to `version`
    pub fn points_to(&self, version: &VersionIdentifier) -> bool {
        self.known().is_some_and(|v| v.is_same_artifact(version))
    }
}

impl From<VersionIdentifier> for Pointer {
    fn from(v: VersionIdentifier) -> Self {
        Pointer::Known(v)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::Known(v) => v.fmt(f),
            Pointer::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl FromStr for Pointer {
    type Err = NodelabError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(UNKNOWN) {
            return Ok(Pointer::Unknown);
        }
        let version = s.parse::<VersionIdentifier>()?;
        Ok(Pointer::Known(version))
    }
}

/// Keyed storage for the two pointers
pub trait PointerStore {
    fn get(&self, key: PointerKey) -> Result<Pointer>;
    fn set(&self, key: PointerKey, pointer: Pointer) -> Result<()>;
}

impl<S: PointerStore + ?Sized> PointerStore for &S {
    fn get(&self, key: PointerKey) -> Result<Pointer> {
        (**self).get(key)
    }

    fn set(&self, key: PointerKey, pointer: Pointer) -> Result<()> {
        (**self).set(key, pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_parse_unknown() {
        assert_eq!("unknown".parse::<Pointer>().unwrap(), Pointer::Unknown);
        assert_eq!("UNKNOWN".parse::<Pointer>().unwrap(), Pointer::Unknown);
        assert_eq!("".parse::<Pointer>().unwrap(), Pointer::Unknown);
    }

    #[test]
    fn test_pointer_round_trips_through_text() {
        for text in ["6.2.1", "4.4.4-x86", "iojs:3.3.1-x64", "unknown"] {
            let pointer: Pointer = text.parse().unwrap();
            assert_eq!(pointer.to_string(), text);
        }
    }

    #[test]
    fn test_pointer_rejects_alias_text() {
        assert!("latest".parse::<Pointer>().is_err());
    }

    #[test]
    fn test_points_to_uses_identity() {
        let pointer = Pointer::Known(VersionIdentifier::new(6, 2, 1));
        assert!(pointer.points_to(&VersionIdentifier::new(6, 2, 1)));
        assert!(!pointer.points_to(
            &VersionIdentifier::new(6, 2, 1).with_arch(Some(crate::version::ArchSuffix::X86))
        ));
        assert!(!Pointer::Unknown.points_to(&VersionIdentifier::new(6, 2, 1)));
    }
}
