//! `nodelab node-version` - the recorded latest and global versions

use anyhow::{Result, bail};
use std::cmp::Ordering;

use crate::cli::PointerArg;
use crate::context::Context;
use crate::output::{notice, success};
use nodelab_core::store::{Pointer, PointerKey, PointerStore};
use nodelab_core::version::Channel;
use nodelab_node::registry;

/// Execute `nodelab node-version [global|latest] [--remote]`
pub fn run(which: Option<PointerArg>, remote: bool, verbose: bool) -> Result<()> {
    if remote && which != Some(PointerArg::Latest) {
        bail!("--remote only applies to 'nodelab node-version latest'");
    }

    let ctx = Context::new(verbose)?;
    let store = ctx.store();
    let latest = store.get(PointerKey::Latest)?;
    let global = store.get(PointerKey::Global)?;

    match which {
        None => {
            println!("latest version is {}", latest);
            println!("global version is {}", global);
            if latest.is_unknown() {
                notice("latest version is unknown, resolve it with 'nodelab node-version latest --remote'");
            }
            if global.is_unknown() {
                notice("global version is unknown, set it with 'nodelab install latest -g' or 'nodelab use <version>'");
            }
        }
        Some(PointerArg::Global) => println!("global version is {}", global),
        Some(PointerArg::Latest) if !remote => println!("latest version is {}", latest),
        Some(PointerArg::Latest) => {
            let transport = ctx.transport()?;
            let remote_latest =
                registry::remote_latest(&transport, &ctx.registries, Channel::Mainline)?;
            println!(
                "remote latest version is {} ({})",
                remote_latest, ctx.registries.node
            );
            println!("local latest version is {}", latest);

            match &latest {
                Pointer::Unknown => {
                    store.set(PointerKey::Latest, remote_latest.clone().into())?;
                    success(format!("latest version set to {}", remote_latest));
                }
                Pointer::Known(local) if local.compare(&remote_latest) == Ordering::Less => {
                    notice(format!(
                        "remote latest {} is newer than local latest {}, upgrade with 'nodelab update latest [-g]'",
                        remote_latest, local
                    ));
                }
                Pointer::Known(_) => {}
            }
        }
    }
    Ok(())
}
