//! Batch installation of runtime versions
//!
//! Tokens are resolved one by one; anything wrong with a single token ends
//! up as a [`TokenDiagnostic`] and the rest of the batch carries on. All
//! downloads are handed to the [`Transport`] as a single batch.

use thiserror::Error;

use crate::activate::{Activation, ActivationError, Activator};
use crate::platform::Host;
use crate::registry::{self, DiscoveryError, Registries};
use crate::transport::{CompletedTask, InstallTask, TaskFailure, Transport};
use nodelab_core::error::Result;
use nodelab_core::layout::Layout;
use nodelab_core::store::{Pointer, PointerKey, PointerStore};
use nodelab_core::version::{Alias, Channel, VersionError, VersionIdentifier, VersionRequest};

#[derive(Debug, Error)]
pub enum InstallIssue {
    #[error(transparent)]
    Invalid(#[from] VersionError),

    #[error("INSTALL_POINTER_UNKNOWN: the global version is unknown")]
    PointerUnknown,

    #[error("INSTALL_REMOTE_LATEST: could not resolve the latest release: {0}")]
    RemoteLatest(#[source] DiscoveryError),

    #[error(transparent)]
    Discovery(DiscoveryError),
}

#[derive(Debug)]
pub struct TokenDiagnostic {
    pub token: String,
    pub issue: InstallIssue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerChange {
    pub key: PointerKey,
    pub from: Pointer,
    pub to: VersionIdentifier,
}

#[derive(Debug, Default)]
pub struct InstallSummary {
    pub diagnostics: Vec<TokenDiagnostic>,
    /// Already installed, nothing downloaded
    pub satisfied: Vec<VersionIdentifier>,
    pub installed: Vec<CompletedTask>,
    pub failures: Vec<TaskFailure>,
    pub pointer_changes: Vec<PointerChange>,
    pub activation: Option<std::result::Result<Activation, ActivationError>>,
    pub tasks_submitted: usize,
}

impl InstallSummary {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
            || !self.failures.is_empty()
            || matches!(self.activation, Some(Err(_)))
    }

    /// Versions present after the batch, in resolution order
    pub fn confirmed(&self) -> Vec<&VersionIdentifier> {
        self.satisfied
            .iter()
            .chain(self.installed.iter().map(|c| &c.task.target))
            .collect()
    }
}

pub struct InstallOrchestrator<'a> {
    transport: &'a dyn Transport,
    store: &'a dyn PointerStore,
    activator: &'a dyn Activator,
    layout: &'a Layout,
    registries: &'a Registries,
    host: Host,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        store: &'a dyn PointerStore,
        activator: &'a dyn Activator,
        layout: &'a Layout,
        registries: &'a Registries,
    ) -> Self {
        Self {
            transport,
            store,
            activator,
            layout,
            registries,
            host: Host::detect(),
        }
    }

    pub fn with_host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }

    /// Installs every token and optionally activates the single result.
    ///
    /// # Arguments
    ///
    /// * `tokens` - Version tokens as typed, including `latest` and `global`
    /// * `activate_globally` - Activate when exactly one token resolves to
    ///   exactly one present version
    ///
    /// # Returns
    ///
    /// Per-token diagnostics, download outcomes and pointer changes
    ///
    /// # Errors
    ///
    /// Returns error only if the pointer store cannot be read or written;
    /// everything else is reported in the summary
    pub fn install<S: AsRef<str>>(
        &self,
        tokens: &[S],
        activate_globally: bool,
    ) -> Result<InstallSummary> {
        let mut summary = InstallSummary::default();
        if tokens.is_empty() {
            return Ok(summary);
        }

        let mut latest = self.store.get(PointerKey::Latest)?;
        let mut seen: Vec<VersionIdentifier> = Vec::new();
        let mut tasks: Vec<InstallTask> = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            let Some((version, from_latest)) = self.resolve(token, &mut summary)? else {
                continue;
            };

            if seen.iter().any(|s| s.is_same_artifact(&version)) {
                tracing::debug!(%version, "duplicate in batch, skipped");
                if from_latest {
                    // the earlier occurrence now also answers `latest`
                    if let Some(task) = tasks
                        .iter_mut()
                        .find(|t| t.target.is_same_artifact(&version))
                    {
                        task.from_alias = true;
                    } else if summary.satisfied.iter().any(|s| s.is_same_artifact(&version)) {
                        self.record_latest(&version, &mut latest, &mut summary)?;
                    }
                }
                continue;
            }
            seen.push(version.clone());

            if self.layout.is_installed(&version) {
                tracing::debug!(%version, "already installed");
                if from_latest {
                    self.record_latest(&version, &mut latest, &mut summary)?;
                }
                summary.satisfied.push(version);
                continue;
            }

            match registry::discover_binary(self.transport, self.registries, &version, self.host) {
                Ok(remote) => tasks.push(InstallTask {
                    source_url: remote.url,
                    destination: self.layout.version_dir(&version),
                    title: format!("node {}", version),
                    target: version,
                    from_alias: from_latest,
                    artifact: remote.artifact,
                }),
                Err(e) => summary.diagnostics.push(TokenDiagnostic {
                    token: token.to_string(),
                    issue: InstallIssue::Discovery(e),
                }),
            }
        }

        summary.tasks_submitted = tasks.len();
        if !tasks.is_empty() {
            let outcome = self.transport.run_batch(tasks);
            for completed in &outcome.completed {
                if completed.task.from_alias {
                    self.record_latest(&completed.task.target, &mut latest, &mut summary)?;
                }
            }
            summary.installed = outcome.completed;
            summary.failures = outcome.failed;
        }

        if activate_globally && tokens.len() == 1 {
            self.activate_confirmed(&mut summary)?;
        }

        Ok(summary)
    }

    /// `None` when the token produced a diagnostic
    fn resolve(
        &self,
        token: &str,
        summary: &mut InstallSummary,
    ) -> Result<Option<(VersionIdentifier, bool)>> {
        let mut diagnose = |issue| {
            summary.diagnostics.push(TokenDiagnostic {
                token: token.to_string(),
                issue,
            });
        };

        let request = match VersionRequest::parse(token) {
            Ok(request) => request,
            Err(e) => {
                diagnose(InstallIssue::Invalid(e));
                return Ok(None);
            }
        };

        let resolved = match request {
            VersionRequest::Exact { version, .. } => Some((version, false)),
            VersionRequest::Alias(Alias::Latest) => {
                match registry::remote_latest(self.transport, self.registries, Channel::Mainline) {
                    Ok(version) => Some((version, true)),
                    Err(e) => {
                        diagnose(InstallIssue::RemoteLatest(e));
                        None
                    }
                }
            }
            VersionRequest::Alias(Alias::Global) => match self.store.get(PointerKey::Global)? {
                Pointer::Known(version) => Some((version, false)),
                Pointer::Unknown => {
                    diagnose(InstallIssue::PointerUnknown);
                    None
                }
            },
        };
        Ok(resolved)
    }

    fn record_latest(
        &self,
        version: &VersionIdentifier,
        latest: &mut Pointer,
        summary: &mut InstallSummary,
    ) -> Result<()> {
        if latest.points_to(version) {
            return Ok(());
        }
        self.store.set(PointerKey::Latest, version.clone().into())?;
        summary.pointer_changes.push(PointerChange {
            key: PointerKey::Latest,
            from: std::mem::replace(latest, version.clone().into()),
            to: version.clone(),
        });
        Ok(())
    }

    fn activate_confirmed(&self, summary: &mut InstallSummary) -> Result<()> {
        let confirmed = summary.confirmed();
        let [version] = confirmed.as_slice() else {
            return Ok(());
        };
        let version = (*version).clone();

        match self.activator.activate(&version) {
            Ok(activation) => {
                let previous = self.store.get(PointerKey::Global)?;
                if !previous.points_to(&version) {
                    self.store.set(PointerKey::Global, version.clone().into())?;
                    summary.pointer_changes.push(PointerChange {
                        key: PointerKey::Global,
                        from: previous,
                        to: version,
                    });
                }
                summary.activation = Some(Ok(activation));
            }
            Err(e) => {
                tracing::warn!(%version, error = %e, "activation failed, global version unchanged");
                summary.activation = Some(Err(e));
            }
        }
        Ok(())
    }
}
