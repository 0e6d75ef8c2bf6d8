pub mod config;
pub mod error;
pub mod layout;
pub mod lock;
pub mod store;
pub mod version;

pub use error::{NodelabError, Result};
pub use layout::Layout;
pub use store::{FilePointerStore, MemoryPointerStore, Pointer, PointerKey, PointerStore};
pub use version::{Alias, ArchSuffix, Channel, VersionError, VersionIdentifier, VersionRequest};
