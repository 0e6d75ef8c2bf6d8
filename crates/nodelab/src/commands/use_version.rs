//! `nodelab use` - switch the global node binary

use anyhow::{Result, bail};

use crate::context::Context;
use crate::output::{notice, success};
use nodelab_core::version::{Alias, VersionRequest};
use nodelab_node::activate::{Activation, ActivationError, use_version};

/// Execute `nodelab use <version|latest>`
pub fn run(version: String, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;
    let request = VersionRequest::parse(&version)?;
    let store = ctx.store();
    let activator = ctx.activator();

    match use_version(&store, &activator, &request) {
        Ok(activation) => {
            if request.is_alias() {
                println!("{} resolves to node {}", request, activation.version());
            }
            print_activation(&activation);
            Ok(())
        }
        Err(ActivationError::PointerUnknown(Alias::Latest)) => {
            bail!("the latest version is unknown, resolve it with 'nodelab node-version latest --remote'")
        }
        Err(e @ ActivationError::NotInstalled { .. }) => {
            bail!("{}\nSee 'nodelab ls' for installed versions", e)
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn print_activation(activation: &Activation) {
    match activation {
        Activation::AlreadyActive { version } => {
            notice(format!("node {} is already the global version", version));
        }
        Activation::Activated {
            version,
            previous,
            forced_unlock,
        } => {
            if *forced_unlock {
                notice("running node processes were stopped to release the global binary");
            }
            if let Some(previous) = previous {
                println!("Backed up node {}", previous);
            }
            success(format!("Now using node {}", version));
        }
    }
}
