//! Release listing from `<registry>index.json`

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::registry::{self, DiscoveryError};
use crate::transport::{Transport, TransportError};
use nodelab_core::version::{Channel, VersionIdentifier};

#[derive(Debug, Clone, Deserialize)]
struct IndexEntry {
    version: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    npm: Option<String>,
    #[serde(default)]
    v8: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub version: VersionIdentifier,
    pub date: Option<String>,
    pub npm: Option<String>,
    pub v8: Option<String>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Registry(#[from] DiscoveryError),

    #[error("INDEX_UNREACHABLE: {0}")]
    Transport(#[from] TransportError),

    #[error("INDEX_INVALID: {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
}

/// Every release in the index of `base`, newest first.
///
/// Entries whose version is not a plain `vX.Y.Z` are skipped.
pub fn fetch_index(
    transport: &dyn Transport,
    base: &Url,
    channel: Channel,
) -> Result<Vec<RemoteRelease>, IndexError> {
    let url = registry::index_url(base)?;
    let body = transport.fetch(&url)?;
    let entries: Vec<IndexEntry> =
        serde_json::from_slice(&body).map_err(|source| IndexError::Decode {
            url: url.clone(),
            source,
        })?;

    let mut releases: Vec<RemoteRelease> = entries
        .into_iter()
        .filter_map(|entry| {
            let version = VersionIdentifier::from_release_str(&entry.version)?;
            Some(RemoteRelease {
                version: version.with_channel(channel),
                date: entry.date,
                npm: entry.npm,
                v8: entry.v8,
            })
        })
        .collect();

    releases.sort_by(|a, b| b.version.compare(&a.version));
    tracing::debug!(%url, count = releases.len(), "release index loaded");
    Ok(releases)
}
