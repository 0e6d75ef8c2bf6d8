//! `nodelab ls` - installed versions and remote releases

use anyhow::Result;
use colored::Colorize;

use crate::context::Context;
use crate::output::notice;
use nodelab_core::store::{Pointer, PointerKey, PointerStore};
use nodelab_core::version::{Channel, VersionIdentifier};
use nodelab_node::registry;
use nodelab_node::remote::{RemoteRelease, fetch_index};

/// Execute `nodelab ls`
pub fn run_local(verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;
    let store = ctx.store();
    let latest = store.get(PointerKey::Latest)?;
    let global = store.get(PointerKey::Global)?;

    println!("node root is {}", ctx.layout.root().display());

    let versions = ctx.layout.installed_versions()?;
    if versions.is_empty() {
        notice("no versions installed yet, see 'nodelab install --help'");
        return Ok(());
    }

    for version in &versions {
        let markers = local_markers(version, &global, &latest);
        if markers.is_empty() {
            println!("{}", version);
        } else {
            println!("{} -- {}", version, markers.join(", ").green());
        }
    }
    Ok(())
}

fn local_markers(version: &VersionIdentifier, global: &Pointer, latest: &Pointer) -> Vec<&'static str> {
    let mut markers = Vec::new();
    if global.points_to(version) {
        markers.push("global");
    }
    if latest.points_to(version) {
        markers.push("latest");
    }
    if let Some(arch) = version.arch {
        markers.push(arch.as_str());
    }
    markers
}

/// Execute `nodelab ls --remote [--limit N] [--iojs]`
pub fn run_remote(limit: Option<usize>, iojs: bool, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;
    let channel = if iojs {
        Channel::Alternate
    } else {
        Channel::Mainline
    };
    let base = ctx.registries.for_channel(channel);
    let transport = ctx.transport()?;

    println!(
        "Reading the release list from {}, please wait...",
        registry::index_url(base)?
    );
    let releases = fetch_index(&transport, base, channel)?;

    match limit {
        None => {
            for release in &releases {
                let line = format!("v{}", release.version.release());
                if ctx.layout.is_installed(&release.version) {
                    println!("{} {}", line, "(installed)".green());
                } else {
                    println!("{}", line);
                }
            }
        }
        Some(limit) => print_details(&releases[..limit.min(releases.len())]),
    }
    Ok(())
}

fn print_details(releases: &[RemoteRelease]) {
    println!(
        "{}",
        format!("{:<6}{:<12}{:<12}{:<10}{}", "No.", "date", "node", "npm", "v8").bold()
    );
    for (idx, release) in releases.iter().enumerate() {
        println!(
            "{:<6}{:<12}{:<12}{:<10}{}",
            idx + 1,
            release.date.as_deref().unwrap_or("-"),
            format!("v{}", release.version.release()),
            release.npm.as_deref().unwrap_or("-"),
            release.v8.as_deref().unwrap_or("-"),
        );
    }
}
