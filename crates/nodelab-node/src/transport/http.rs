use reqwest::blocking::{Client, Response};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use url::Url;

use super::client::{DEFAULT_TIMEOUT, DOWNLOAD_TIMEOUT, build_client};
use super::extract::{extract_tar_gz, find_binary_in_dir};
use super::{Artifact, BatchOutcome, CompletedTask, InstallTask, TaskFailure, Transport, TransportError};
use crate::fsutil::{atomic_copy, set_executable};
use nodelab_core::config::consts::NODE_BINARY;

/// Blocking reqwest transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    download_client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT).map_err(TransportError::Client)?,
            download_client: build_client(DOWNLOAD_TIMEOUT).map_err(TransportError::Client)?,
        })
    }

    fn get(&self, client: &Client, url: &Url) -> Result<Response, TransportError> {
        tracing::debug!(%url, "GET");
        let response = client
            .get(url.as_str())
            .send()
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                source: e.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Streams the body into a temp file inside `dir`
    fn download_to_temp(&self, url: &Url, dir: &Path) -> Result<tempfile::NamedTempFile, TransportError> {
        let mut response = self.get(&self.download_client, url)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| TransportError::io("create temporary file for download", e))?;

        let written = io::copy(&mut response, &mut temp_file)
            .map_err(|e| TransportError::io(format!("download {}", url), e))?;
        temp_file
            .flush()
            .and_then(|_| temp_file.as_file().sync_all())
            .map_err(|e| TransportError::io("sync temporary file", e))?;

        tracing::debug!(%url, bytes = written, "download complete");
        Ok(temp_file)
    }

    fn install(&self, task: &InstallTask) -> Result<PathBuf, TransportError> {
        let root = task
            .destination
            .parent()
            .ok_or_else(|| {
                TransportError::io(
                    "resolve node root",
                    io::Error::other(format!("{} has no parent", task.destination.display())),
                )
            })?
            .to_path_buf();
        fs::create_dir_all(&task.destination).map_err(|e| {
            TransportError::io(format!("create directory {}", task.destination.display()), e)
        })?;

        let result = self.install_into(task, &root);
        if result.is_err() {
            // only succeeds when nothing was written
            let _ = fs::remove_dir(&task.destination);
        }
        result
    }

    fn install_into(&self, task: &InstallTask, root: &Path) -> Result<PathBuf, TransportError> {
        let downloaded = self.download_to_temp(&task.source_url, root)?;
        let final_path = task.destination.join(NODE_BINARY);

        match task.artifact {
            Artifact::Binary => {
                set_executable(downloaded.path())
                    .map_err(|e| TransportError::io("set executable permissions", e))?;
                downloaded.persist(&final_path).map_err(|e| {
                    TransportError::io(format!("persist {}", final_path.display()), e.error)
                })?;
            }
            Artifact::TarGz => {
                let extract_dir = tempfile::tempdir_in(root)
                    .map_err(|e| TransportError::io("create extraction directory", e))?;
                extract_tar_gz(downloaded.path(), extract_dir.path())?;

                let binary = find_binary_in_dir(extract_dir.path(), NODE_BINARY)?;
                set_executable(&binary)
                    .map_err(|e| TransportError::io("set executable permissions", e))?;
                atomic_copy(&binary, &final_path).map_err(|e| {
                    TransportError::io(format!("install {}", final_path.display()), e)
                })?;
            }
        }

        Ok(final_path)
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let mut response = self.get(&self.client, url)?;
        let mut body = Vec::new();
        io::copy(&mut response, &mut body)
            .map_err(|e| TransportError::io(format!("read {}", url), e))?;
        Ok(body)
    }

    fn fetch_lines(
        &self,
        url: &Url,
        on_line: &mut dyn FnMut(&str, usize) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        let response = self.get(&self.client, url)?;
        for (idx, line) in BufReader::new(response).lines().enumerate() {
            let line = line.map_err(|e| TransportError::io(format!("read {}", url), e))?;
            if on_line(&line, idx + 1).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn run_batch(&self, tasks: Vec<InstallTask>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for task in tasks {
            tracing::info!(title = %task.title, url = %task.source_url, "downloading");
            match self.install(&task) {
                Ok(installed_path) => outcome.completed.push(CompletedTask {
                    task,
                    installed_path,
                }),
                Err(error) => {
                    tracing::warn!(title = %task.title, %error, "download failed");
                    outcome.failed.push(TaskFailure { task, error });
                }
            }
        }

        outcome
    }
}
