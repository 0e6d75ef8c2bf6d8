//! Network transport
//!
//! Everything the install path needs from the network goes through
//! [`Transport`]: whole-body fetches, line-by-line listings and the download
//! batch. [`HttpTransport`] is the blocking reqwest implementation; tests
//! substitute in-memory fakes.

mod client;
pub(crate) mod extract;
mod http;

pub use client::{DEFAULT_TIMEOUT, DOWNLOAD_TIMEOUT, USER_AGENT, build_client};
pub use http::HttpTransport;

use std::ops::ControlFlow;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use nodelab_core::version::VersionIdentifier;

/// Shape of the upstream file a task downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// The executable itself (`win-x64/node.exe`)
    Binary,
    /// A release tarball with the executable under `<top>/bin/`
    TarGz,
}

impl Artifact {
    pub fn for_path(path: &str) -> Self {
        if path.ends_with(".tar.gz") {
            Artifact::TarGz
        } else {
            Artifact::Binary
        }
    }
}

/// One download unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTask {
    pub source_url: Url,
    pub target: VersionIdentifier,
    /// Per-version directory the binary lands in
    pub destination: PathBuf,
    pub title: String,
    /// The request was `latest`
    pub from_alias: bool,
    pub artifact: Artifact,
}

#[derive(Debug)]
pub struct CompletedTask {
    pub task: InstallTask,
    pub installed_path: PathBuf,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub task: InstallTask,
    pub error: TransportError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed: Vec<CompletedTask>,
    pub failed: Vec<TaskFailure>,
}

pub trait Transport {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    /// Calls `on_line(line, line_number)` for each line of the body, 1-based,
    /// until the callback breaks or the body ends.
    fn fetch_lines(
        &self,
        url: &Url,
        on_line: &mut dyn FnMut(&str, usize) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        let body = self.fetch(url)?;
        for (idx, line) in String::from_utf8_lossy(&body).lines().enumerate() {
            if on_line(line, idx + 1).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Runs every task; one failure never stops the others
    fn run_batch(&self, tasks: Vec<InstallTask>) -> BatchOutcome;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        (**self).fetch(url)
    }

    fn fetch_lines(
        &self,
        url: &Url,
        on_line: &mut dyn FnMut(&str, usize) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        (**self).fetch_lines(url, on_line)
    }

    fn run_batch(&self, tasks: Vec<InstallTask>) -> BatchOutcome {
        (**self).run_batch(tasks)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("TRANSPORT_CLIENT_ERROR: failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("TRANSPORT_REQUEST_FAILED: {url}: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("TRANSPORT_HTTP_STATUS: {url} returned {status}")]
    Status { url: Url, status: u16 },

    #[error("TRANSPORT_IO_ERROR: {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TRANSPORT_EXTRACT_FAILED: {archive}: {reason}")]
    Extraction { archive: String, reason: String },

    #[error("TRANSPORT_BINARY_NOT_FOUND: {binary} not found in {archive}")]
    BinaryNotFound { binary: String, archive: String },
}

impl TransportError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        TransportError::Io {
            operation: operation.into(),
            source,
        }
    }

    /// HTTP status when the server answered with a non-success code
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
