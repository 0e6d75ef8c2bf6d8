//! `nodelab install` - download versions into the node root

use anyhow::{Result, bail};

use super::use_version::print_activation;
use crate::context::Context;
use crate::output::{failure, notice, success};
use nodelab_node::install::{InstallOrchestrator, InstallSummary};
use nodelab_node::npm::{self, NpmInstall};

/// Execute `nodelab install <versions>... [-g]`
pub fn run(versions: Vec<String>, global: bool, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;

    if let [only] = versions.as_slice() {
        if only.trim().eq_ignore_ascii_case("npm") {
            return install_npm(&ctx);
        }
    }
    if global && versions.len() > 1 {
        notice("--global is ignored when installing more than one version");
    }

    let transport = ctx.transport()?;
    let store = ctx.store();
    let activator = ctx.activator();

    let summary = InstallOrchestrator::new(
        &transport,
        &store,
        &activator,
        &ctx.layout,
        &ctx.registries,
    )
    .install(&versions, global)?;

    report(&ctx, &summary);

    if summary.has_errors() {
        bail!("not every requested version was installed, see the messages above");
    }
    Ok(())
}

/// Prints every outcome recorded in `summary`
pub(crate) fn report(ctx: &Context, summary: &InstallSummary) {
    for diagnostic in &summary.diagnostics {
        failure(format!("{}: {}", diagnostic.token, diagnostic.issue));
    }

    for version in &summary.satisfied {
        notice(format!("node {} is already installed", version));
    }

    for completed in &summary.installed {
        success(format!("Installed {}", completed.task.title));
        if ctx.verbose {
            println!("  {}", completed.installed_path.display());
        }
    }

    for failed in &summary.failures {
        failure(format!("{}: {}", failed.task.title, failed.error));
    }

    for change in &summary.pointer_changes {
        println!("{}: {} -> {}", change.key, change.from, change.to);
    }

    match &summary.activation {
        Some(Ok(activation)) => print_activation(activation),
        Some(Err(e)) => failure(e),
        None => {}
    }
}

fn install_npm(ctx: &Context) -> Result<()> {
    let transport = ctx.transport()?;
    println!("Reading npm releases from {}npm/ ...", ctx.registries.node);

    match npm::install_npm(&transport, &ctx.registries.node, &ctx.layout)? {
        NpmInstall::AlreadyInstalled => {
            notice(format!(
                "npm is already installed in {}, remove it first with 'nodelab uninstall npm'",
                ctx.layout.root().display()
            ));
        }
        NpmInstall::Installed { release, files } => {
            success(format!(
                "Installed npm {} ({} files) into {}",
                release.version,
                files,
                ctx.layout.root().display()
            ));
        }
    }
    Ok(())
}
