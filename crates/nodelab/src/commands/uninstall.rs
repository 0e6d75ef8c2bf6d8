//! `nodelab uninstall` - remove a version directory or npm

use anyhow::{Context as _, Result, anyhow, bail};
use std::fs;

use crate::context::Context;
use crate::output::{notice, success};
use nodelab_core::store::{PointerKey, PointerStore};
use nodelab_core::version::VersionRequest;
use nodelab_node::npm;

/// Execute `nodelab uninstall <version|npm>`
pub fn run(version: String, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;

    if version.trim().eq_ignore_ascii_case("npm") {
        return uninstall_npm(&ctx);
    }

    let store = ctx.store();
    let target = match VersionRequest::parse(&version)? {
        VersionRequest::Exact { version, .. } => version,
        VersionRequest::Alias(alias) => store
            .get(alias.into())?
            .known()
            .cloned()
            .ok_or_else(|| anyhow!("the {} version is unknown, nothing to remove", alias))?,
    };

    if store.get(PointerKey::Global)?.points_to(&target) {
        bail!(
            "node {} is the global version; switch with 'nodelab use <version>' before removing it",
            target
        );
    }

    let dir = ctx.layout.version_dir(&target);
    if !dir.is_dir() {
        bail!(
            "node {} is not installed ({} does not exist), see 'nodelab ls'",
            target,
            dir.display()
        );
    }

    fs::remove_dir_all(&dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    success(format!("Uninstalled node {}", target));
    Ok(())
}

fn uninstall_npm(ctx: &Context) -> Result<()> {
    let removed = npm::uninstall_npm(&ctx.layout)?;
    if removed.is_empty() {
        notice(format!("npm is not installed in {}", ctx.layout.root().display()));
    } else {
        success(format!("Uninstalled npm from {}", ctx.layout.root().display()));
    }
    Ok(())
}
