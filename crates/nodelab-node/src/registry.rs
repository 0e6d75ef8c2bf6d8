//! Registry URLs, remote latest lookup and binary path discovery
//!
//! A registry is laid out like `https://nodejs.org/dist/`:
//!
//! ```text
//! latest/SHASUMS256.txt
//! v6.2.1/SHASUMS256.txt
//! v6.2.1/win-x64/node.exe
//! index.json
//! npm/
//! ```
//!
//! SHASUMS256.txt is only read for the file paths it lists.

use std::collections::HashSet;
use std::ops::ControlFlow;
use thiserror::Error;
use url::Url;

use crate::platform::{Host, Os};
use crate::transport::{Artifact, Transport, TransportError};
use nodelab_core::config::Config;
use nodelab_core::version::{Channel, VersionIdentifier};

pub const SHASUMS: &str = "SHASUMS256.txt";
pub const INDEX: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registries {
    pub node: Url,
    pub iojs: Url,
}

impl Registries {
    /// Registry bases for both channels from `config`
    ///
    /// # Errors
    ///
    /// Returns `REGISTRY_INVALID` if either configured registry is not a URL
    pub fn from_config(config: &Config) -> Result<Self, DiscoveryError> {
        Ok(Self {
            node: parse_base(&config.registry)?,
            iojs: parse_base(&config.iojs_registry)?,
        })
    }

    pub fn for_channel(&self, channel: Channel) -> &Url {
        match channel {
            Channel::Mainline => &self.node,
            Channel::Alternate => &self.iojs,
        }
    }
}

/// Parses a registry base, forcing a trailing `/` so joins stay below it
///
/// # Errors
///
/// Returns `REGISTRY_INVALID` if `raw` is not an absolute URL
pub fn parse_base(raw: &str) -> Result<Url, DiscoveryError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| DiscoveryError::InvalidRegistry {
        registry: raw,
        reason: e.to_string(),
    })
}

fn join(base: &Url, path: &str) -> Result<Url, DiscoveryError> {
    base.join(path).map_err(|e| DiscoveryError::InvalidRegistry {
        registry: base.to_string(),
        reason: e.to_string(),
    })
}

pub fn latest_shasums_url(base: &Url) -> Result<Url, DiscoveryError> {
    join(base, &format!("latest/{}", SHASUMS))
}

pub fn version_shasums_url(base: &Url, version: &VersionIdentifier) -> Result<Url, DiscoveryError> {
    join(base, &format!("v{}/{}", version.release(), SHASUMS))
}

pub fn index_url(base: &Url) -> Result<Url, DiscoveryError> {
    join(base, INDEX)
}

pub fn npm_listing_url(base: &Url) -> Result<Url, DiscoveryError> {
    join(base, "npm/")
}

pub fn npm_archive_url(base: &Url, file_name: &str) -> Result<Url, DiscoveryError> {
    join(base, &format!("npm/{}", file_name))
}

/// Where a release's binary lives upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub url: Url,
    pub artifact: Artifact,
}

/// Newest release announced by `<registry>latest/SHASUMS256.txt`.
///
/// The version is taken from the first listed file named
/// `node-v<x.y.z>...` / `iojs-v<x.y.z>...`.
///
/// # Arguments
///
/// * `channel` - Selects the registry; also set on the returned version
///
/// # Errors
///
/// Returns `REGISTRY_UNREACHABLE` if the listing cannot be fetched and
/// `REGISTRY_NO_VERSION` if no line names a release
pub fn remote_latest(
    transport: &dyn Transport,
    registries: &Registries,
    channel: Channel,
) -> Result<VersionIdentifier, DiscoveryError> {
    let url = latest_shasums_url(registries.for_channel(channel))?;
    let mut found = None;

    transport
        .fetch_lines(&url, &mut |line, _| match release_in_shasums_line(line) {
            Some(v) => {
                found = Some(v);
                ControlFlow::Break(())
            }
            None => ControlFlow::Continue(()),
        })
        .map_err(|source| DiscoveryError::Transport {
            url: url.clone(),
            source,
        })?;

    let version = found.ok_or_else(|| DiscoveryError::NoVersionListed { url: url.clone() })?;
    tracing::debug!(%version, %url, "remote latest resolved");
    Ok(version.with_channel(channel))
}

fn release_in_shasums_line(line: &str) -> Option<VersionIdentifier> {
    let file = line.split_whitespace().nth(1)?;
    let rest = file
        .strip_prefix("node-v")
        .or_else(|| file.strip_prefix("iojs-v"))?;
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    VersionIdentifier::from_release_str(rest[..end].trim_end_matches('.'))
}

/// Candidate upstream paths for `version` on `host`, most preferred first
pub fn binary_candidates(version: &VersionIdentifier, host: Host) -> Vec<String> {
    let arch = version
        .arch
        .map(|a| a.as_str())
        .unwrap_or_else(|| host.arch.dist_name());

    match host.os {
        Os::Windows => {
            let mut candidates = vec![format!("win-{}/node.exe", arch), format!("{}/node.exe", arch)];
            if arch == "x86" {
                candidates.push("node.exe".to_string());
            }
            candidates
        }
        Os::Linux | Os::MacOS => {
            let os = host.os.dist_name();
            vec![
                format!("{}-{}/node", os, arch),
                format!("{}/node", arch),
                format!(
                    "{}-v{}-{}-{}.tar.gz",
                    version.channel.prefix(),
                    version.release(),
                    os,
                    arch
                ),
            ]
        }
    }
}

/// Finds the binary for `version` with a single SHASUMS request
///
/// # Returns
///
/// The download URL of the first [`binary_candidates`] entry that the
/// listing contains, and whether it is a bare binary or a tarball
///
/// # Errors
///
/// Returns `REGISTRY_UNREACHABLE` if the listing cannot be fetched and
/// `REGISTRY_NO_BINARY` if none of the candidates is listed
pub fn discover_binary(
    transport: &dyn Transport,
    registries: &Registries,
    version: &VersionIdentifier,
    host: Host,
) -> Result<RemoteArtifact, DiscoveryError> {
    let base = registries.for_channel(version.channel);
    let url = version_shasums_url(base, version)?;

    let mut listed = HashSet::new();
    transport
        .fetch_lines(&url, &mut |line, _| {
            if let Some(path) = line.split_whitespace().nth(1) {
                listed.insert(path.trim_start_matches("./").to_string());
            }
            ControlFlow::Continue(())
        })
        .map_err(|source| DiscoveryError::Transport {
            url: url.clone(),
            source,
        })?;

    let candidates = binary_candidates(version, host);
    let chosen = candidates
        .iter()
        .find(|c| listed.contains(c.as_str()))
        .ok_or_else(|| DiscoveryError::NoBinaryForHost {
            version: version.clone(),
            tried: candidates.clone(),
        })?;

    let binary_url = join(base, &format!("v{}/{}", version.release(), chosen))?;
    tracing::debug!(%version, url = %binary_url, "binary discovered");
    Ok(RemoteArtifact {
        url: binary_url,
        artifact: Artifact::for_path(chosen),
    })
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("REGISTRY_INVALID: '{registry}': {reason}")]
    InvalidRegistry { registry: String, reason: String },

    #[error("REGISTRY_UNREACHABLE: {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: TransportError,
    },

    #[error("REGISTRY_NO_VERSION: no release listed in {url}")]
    NoVersionListed { url: Url },

    #[error("REGISTRY_NO_BINARY: no download of {version} for this platform (tried {})", .tried.join(", "))]
    NoBinaryForHost {
        version: VersionIdentifier,
        tried: Vec<String>,
    },
}
