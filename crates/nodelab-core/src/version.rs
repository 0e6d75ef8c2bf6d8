//! Node runtime version identifiers
//!
//! A [`VersionIdentifier`] names one installable artifact: a release triple,
//! an optional architecture suffix and the distribution channel it comes
//! from. Requests typed by the user are parsed into a [`VersionRequest`],
//! which may still be an alias (`latest`, `global`) that has to be resolved
//! before anything is compared or downloaded.
//!
//! Two notions of equality exist and are kept apart on purpose:
//!
//! - **ordering** ([`VersionIdentifier::compare`]) looks at the triple only;
//! - **identity** (`==`) also includes the architecture suffix and channel.
//!
//! `6.2.1` and `6.2.1-x86` compare equal but are different installs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Architecture suffix selecting a specific binary build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchSuffix {
    X86,
    X64,
}

impl ArchSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchSuffix::X86 => "x86",
            ArchSuffix::X64 => "x64",
        }
    }

    /// Matches the exact tokens `x86` and `x64`
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "x86" => Some(ArchSuffix::X86),
            "x64" => Some(ArchSuffix::X64),
            _ => None,
        }
    }
}

impl fmt::Display for ArchSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream distribution line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    /// nodejs.org releases
    #[default]
    Mainline,
    /// io.js releases
    Alternate,
}

impl Channel {
    pub fn prefix(self) -> &'static str {
        match self {
            Channel::Mainline => "node",
            Channel::Alternate => "iojs",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "node" => Some(Channel::Mainline),
            "iojs" => Some(Channel::Alternate),
            _ => None,
        }
    }

    /// Channel a bare release number belongs to.
    ///
    /// io.js shipped 1.x through 3.x; Node went from 0.12 straight to 4.0.
    pub fn for_major(major: u64) -> Self {
        if (1..=3).contains(&major) {
            Channel::Alternate
        } else {
            Channel::Mainline
        }
    }
}

/// A concrete, installable runtime version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionIdentifier {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub arch: Option<ArchSuffix>,
    pub channel: Channel,
}

impl VersionIdentifier {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            arch: None,
            channel: Channel::Mainline,
        }
    }

    pub fn with_arch(mut self, arch: Option<ArchSuffix>) -> Self {
        self.arch = arch;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Release ordering on `(major, minor, patch)` only
    pub fn compare(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }

    /// Identity check used for "is this the same installed artifact"
    pub fn is_same_artifact(&self, other: &Self) -> bool {
        self == other
    }

    /// Bare release number, e.g. `6.2.1`
    pub fn release(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Name of the per-version directory under the node root
    pub fn dir_name(&self) -> String {
        let mut name = String::new();
        if self.channel == Channel::Alternate {
            name.push_str(Channel::Alternate.prefix());
            name.push('-');
        }
        name.push_str(&self.release());
        if let Some(arch) = self.arch {
            name.push('-');
            name.push_str(arch.as_str());
        }
        name
    }

    /// Inverse of [`dir_name`](Self::dir_name); `None` for unrelated entries
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let (channel, rest) = match name.strip_prefix("iojs-") {
            Some(rest) => (Channel::Alternate, rest),
            None => (Channel::Mainline, name),
        };
        parse_numeric_with_suffix(rest, rest)
            .ok()
            .map(|v| v.with_channel(channel))
    }

    /// Parses a release string such as `v6.2.1` or `6.2.1` (no suffix)
    pub fn from_release_str(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let [major, minor, patch] = parse_triple(s)?;
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for VersionIdentifier {
    /// The channel prefix is written whenever a bare triple would parse
    /// back into the other channel.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.channel != Channel::for_major(self.major) || self.channel == Channel::Alternate {
            write!(f, "{}:", self.channel.prefix())?;
        }
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(arch) = self.arch {
            write!(f, "-{}", arch)?;
        }
        Ok(())
    }
}

impl FromStr for VersionIdentifier {
    type Err = VersionError;

    /// Parses a concrete version; aliases are rejected as a shape error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match VersionRequest::parse(s)? {
            VersionRequest::Exact { version, .. } => Ok(version),
            VersionRequest::Alias(_) => Err(VersionError::InvalidVersionShape {
                token: s.to_string(),
            }),
        }
    }
}

/// Tokens that stand for a version recorded elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alias {
    Latest,
    Global,
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alias::Latest => f.write_str("latest"),
            Alias::Global => f.write_str("global"),
        }
    }
}

/// A parsed, not yet resolved, version request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Alias(Alias),
    Exact {
        version: VersionIdentifier,
        /// `^x.y.z` was written; accepted but not expanded to a range
        caret: bool,
    },
}

impl VersionRequest {
    pub fn parse(token: &str) -> Result<Self, VersionError> {
        let trimmed = token.trim();

        if let Some(alias) = parse_alias(trimmed) {
            return Ok(VersionRequest::Alias(alias));
        }
        if trimmed.eq_ignore_ascii_case("npm") {
            return Err(VersionError::NotARuntimeArtifact {
                token: token.to_string(),
            });
        }

        let (channel, body) = match trimmed.split_once(':') {
            Some((prefix, rest)) => {
                let channel =
                    Channel::from_prefix(prefix).ok_or_else(|| VersionError::InvalidChannelPrefix {
                        token: token.to_string(),
                        prefix: prefix.to_string(),
                    })?;
                (channel, rest)
            }
            None => (Channel::Mainline, trimmed),
        };
        let explicit_channel = trimmed.contains(':');

        let (caret, body) = match body.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let body = body.strip_prefix('v').unwrap_or(body);

        let version = parse_numeric_with_suffix(body, token)?;
        let channel = if explicit_channel {
            channel
        } else {
            Channel::for_major(version.major)
        };
        Ok(VersionRequest::Exact {
            version: version.with_channel(channel),
            caret,
        })
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, VersionRequest::Alias(_))
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Alias(alias) => alias.fmt(f),
            VersionRequest::Exact { version, caret: false } => version.fmt(f),
            VersionRequest::Exact { version, caret: true } => {
                let text = version.to_string();
                match text.split_once(':') {
                    Some((prefix, rest)) => write!(f, "{}:^{}", prefix, rest),
                    None => write!(f, "^{}", text),
                }
            }
        }
    }
}

fn parse_alias(token: &str) -> Option<Alias> {
    if token.eq_ignore_ascii_case("latest") {
        Some(Alias::Latest)
    } else if token.eq_ignore_ascii_case("global") {
        Some(Alias::Global)
    } else {
        None
    }
}

/// `x.y.z` optionally followed by `-x86` / `-x64`
fn parse_numeric_with_suffix(body: &str, token: &str) -> Result<VersionIdentifier, VersionError> {
    let (numeric, suffix) = match body.split_once('-') {
        Some((numeric, suffix)) => (numeric, Some(suffix)),
        None => (body, None),
    };

    let [major, minor, patch] =
        parse_triple(numeric).ok_or_else(|| VersionError::InvalidVersionShape {
            token: token.to_string(),
        })?;

    let arch = match suffix {
        Some(suffix) => Some(ArchSuffix::from_token(suffix).ok_or_else(|| {
            VersionError::InvalidArchSuffix {
                token: token.to_string(),
                suffix: suffix.to_string(),
            }
        })?),
        None => None,
    };

    Ok(VersionIdentifier::new(major, minor, patch).with_arch(arch))
}

fn parse_triple(s: &str) -> Option<[u64; 3]> {
    let mut parts = s.split('.');
    let mut triple = [0u64; 3];
    for slot in triple.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(triple)
}

/// Version token errors, one variant per kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("'{token}' is not a node runtime version; npm is managed with `nodelab install npm`")]
    NotARuntimeArtifact { token: String },

    #[error("'{token}': architecture suffix '{suffix}' must be 'x86' or 'x64'")]
    InvalidArchSuffix { token: String, suffix: String },

    #[error("'{token}': expected 'x.y.z', '^x.y.z' or 'x.y.z-x86|x64'")]
    InvalidVersionShape { token: String },

    #[error("'{token}': unknown channel prefix '{prefix}', expected 'node:' or 'iojs:'")]
    InvalidChannelPrefix { token: String, prefix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionErrorKind {
    NotARuntimeArtifact,
    InvalidArchSuffix,
    InvalidVersionShape,
    InvalidChannelPrefix,
}

impl VersionError {
    pub fn kind(&self) -> VersionErrorKind {
        match self {
            VersionError::NotARuntimeArtifact { .. } => VersionErrorKind::NotARuntimeArtifact,
            VersionError::InvalidArchSuffix { .. } => VersionErrorKind::InvalidArchSuffix,
            VersionError::InvalidVersionShape { .. } => VersionErrorKind::InvalidVersionShape,
            VersionError::InvalidChannelPrefix { .. } => VersionErrorKind::InvalidChannelPrefix,
        }
    }
}
