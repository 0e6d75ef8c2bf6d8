//! `nodelab update latest` - move the latest pointer to the newest release

use anyhow::{Context as _, Result, bail};
use std::cmp::Ordering;

use super::install::report;
use super::use_version::print_activation;
use crate::context::Context;
use crate::output::{notice, success};
use nodelab_core::store::{PointerKey, PointerStore};
use nodelab_core::version::{Channel, VersionIdentifier, VersionRequest};
use nodelab_node::activate::use_version;
use nodelab_node::install::InstallOrchestrator;
use nodelab_node::registry;

/// Execute `nodelab update latest [-g]`
pub fn run(global: bool, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;
    let transport = ctx.transport()?;
    let store = ctx.store();
    let activator = ctx.activator();

    let local = store.get(PointerKey::Latest)?;
    println!("local latest version is {}", local);

    let remote = registry::remote_latest(&transport, &ctx.registries, Channel::Mainline)
        .context("could not resolve the remote latest version, check 'nodelab config registry'")?;
    println!("remote latest version is {} ({})", remote, ctx.registries.node);

    if let Some(local) = local.known() {
        match local.compare(&remote) {
            Ordering::Greater => {
                notice(format!(
                    "local latest {} is newer than remote latest {}, check your registry with 'nodelab config registry'",
                    local, remote
                ));
                return Ok(());
            }
            Ordering::Equal if ctx.layout.is_installed(local) => {
                println!("node {} is up to date", local);
                if global {
                    let request = VersionRequest::Exact {
                        version: local.clone(),
                        caret: false,
                    };
                    print_activation(&use_version(&store, &activator, &request)?);
                }
                return Ok(());
            }
            Ordering::Equal => notice(format!("node {} is not installed locally", local)),
            Ordering::Less => {}
        }
    }

    let summary = InstallOrchestrator::new(
        &transport,
        &store,
        &activator,
        &ctx.layout,
        &ctx.registries,
    )
    .install(&[remote.to_string()], global)?;
    report(&ctx, &summary);

    if !confirmed(&summary.confirmed(), &remote) {
        bail!("node {} could not be installed", remote);
    }
    if !store.get(PointerKey::Latest)?.points_to(&remote) {
        store.set(PointerKey::Latest, remote.clone().into())?;
    }
    success(format!("latest version is now {}", remote));

    if summary.has_errors() {
        bail!("update finished with errors, see the messages above");
    }
    Ok(())
}

fn confirmed(versions: &[&VersionIdentifier], wanted: &VersionIdentifier) -> bool {
    versions.iter().any(|v| v.is_same_artifact(wanted))
}
