//! npm next to the node binaries
//!
//! Registries publish npm as zip archives under `<registry>npm/`. The
//! directory listing is an HTML index with one archive per line:
//!
//! ```text
//! <a href="npm-1.3.9.zip">npm-1.3.9.zip</a>  23-Aug-2013 21:14  1535885
//! ```

use chrono::NaiveDateTime;
use std::fs;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use crate::registry::{self, DiscoveryError};
use crate::transport::{Transport, TransportError, extract};
use nodelab_core::layout::Layout;

const LISTING_TIME_FORMAT: &str = "%d-%b-%Y %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRelease {
    pub version: String,
    pub file_name: String,
    pub published: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpmInstall {
    AlreadyInstalled,
    Installed { release: NpmRelease, files: usize },
}

#[derive(Debug, Error)]
pub enum NpmError {
    #[error(transparent)]
    Registry(#[from] DiscoveryError),

    #[error("NPM_NO_RELEASE: no npm archive listed in {url}")]
    NoRelease { url: Url },

    #[error("NPM_DOWNLOAD_FAILED: {0}")]
    Transport(#[from] TransportError),

    #[error("NPM_IO_ERROR: {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

fn io_error(operation: impl Into<String>) -> impl FnOnce(io::Error) -> NpmError {
    let operation = operation.into();
    move |source| NpmError::Io { operation, source }
}

/// Parses one line of the npm directory listing
pub fn parse_listing_line(line: &str) -> Option<NpmRelease> {
    let (_, rest) = line.split_once("href=\"")?;
    let (file_name, rest) = rest.split_once('"')?;
    let version = file_name.strip_prefix("npm-")?.strip_suffix(".zip")?;
    if version.is_empty() {
        return None;
    }

    let (_, after_link) = rest.split_once("</a>")?;
    let mut fields = after_link.split_whitespace();
    let stamp = format!("{} {}", fields.next()?, fields.next()?);
    let published = NaiveDateTime::parse_from_str(&stamp, LISTING_TIME_FORMAT).ok()?;

    Some(NpmRelease {
        version: version.to_string(),
        file_name: file_name.to_string(),
        published,
    })
}

/// Newest archive in the listing by publication time, in one pass
///
/// # Errors
///
/// Returns `NPM_DOWNLOAD_FAILED` if the listing cannot be fetched and
/// `NPM_NO_RELEASE` if it names no archive
pub fn latest_npm(transport: &dyn Transport, base: &Url) -> Result<NpmRelease, NpmError> {
    let url = registry::npm_listing_url(base)?;
    let mut newest: Option<NpmRelease> = None;

    transport.fetch_lines(&url, &mut |line, _| {
        if let Some(release) = parse_listing_line(line) {
            if newest.as_ref().is_none_or(|n| release.published > n.published) {
                newest = Some(release);
            }
        }
        ControlFlow::Continue(())
    })?;

    let newest = newest.ok_or(NpmError::NoRelease { url })?;
    tracing::debug!(version = %newest.version, published = %newest.published, "latest npm");
    Ok(newest)
}

/// Downloads the newest npm and unpacks it into the node root
///
/// # Returns
///
/// [`NpmInstall::AlreadyInstalled`] without any request when npm is
/// present, otherwise the release and the number of extracted files
///
/// # Errors
///
/// Returns error if discovery or the download fails, or if the archive
/// cannot be written or extracted
pub fn install_npm(
    transport: &dyn Transport,
    base: &Url,
    layout: &Layout,
) -> Result<NpmInstall, NpmError> {
    if layout.npm_installed() {
        return Ok(NpmInstall::AlreadyInstalled);
    }

    let release = latest_npm(transport, base)?;
    let archive_url = registry::npm_archive_url(base, &release.file_name)?;
    let body = transport.fetch(&archive_url)?;

    fs::create_dir_all(layout.root())
        .map_err(io_error(format!("create {}", layout.root().display())))?;
    let mut archive = tempfile::NamedTempFile::new_in(layout.root())
        .map_err(io_error("create temporary npm archive"))?;
    archive
        .write_all(&body)
        .and_then(|_| archive.flush())
        .map_err(io_error("write temporary npm archive"))?;

    // the temp file is removed on drop
    let files = extract::extract_zip(archive.path(), layout.root())?;
    tracing::info!(version = %release.version, files, "npm installed");
    Ok(NpmInstall::Installed { release, files })
}

/// Removes npm from the node root; returns the paths that were removed
///
/// # Errors
///
/// Returns `NPM_IO_ERROR` if an existing npm file or directory cannot be
/// removed
pub fn uninstall_npm(layout: &Layout) -> Result<Vec<PathBuf>, NpmError> {
    let mut removed = Vec::new();

    for file in [layout.npm_cmd(), layout.npm_shell()] {
        if file.is_file() {
            fs::remove_file(&file).map_err(io_error(format!("remove {}", file.display())))?;
            removed.push(file);
        }
    }

    let module_dir = layout.npm_module_dir();
    if module_dir.is_dir() {
        fs::remove_dir_all(&module_dir)
            .map_err(io_error(format!("remove {}", module_dir.display())))?;
        removed.push(module_dir);
    }

    Ok(removed)
}
