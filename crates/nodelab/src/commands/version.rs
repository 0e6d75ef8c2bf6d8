//! `nodelab version` - tool version and update check

use anyhow::{Result, anyhow};
use colored::Colorize;
use std::ops::ControlFlow;
use url::Url;

use crate::context::Context;
use crate::output::notice;
use nodelab_core::version::VersionIdentifier;
use nodelab_node::platform;
use nodelab_node::transport::Transport;

const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Execute `nodelab version [--remote]`
pub fn run(remote: bool, verbose: bool) -> Result<()> {
    let bits = if platform::detect_arch().is_64bit() {
        "64 bit"
    } else {
        "32 bit"
    };
    println!("nodelab {} ({})", TOOL_VERSION, bits);

    if !remote {
        return Ok(());
    }

    let ctx = Context::new(verbose)?;
    let raw = ctx.config.update_url.as_deref().ok_or_else(|| {
        anyhow!("no update_url configured, set one with 'nodelab config update_url <url>'")
    })?;
    let url = Url::parse(raw)?;
    let transport = ctx.transport()?;

    let mut head_error = None;
    transport.fetch_lines(&url, &mut |line, number| {
        if number > 1 {
            println!("{}", line);
            return ControlFlow::Continue(());
        }
        match parse_manifest_head(line) {
            Some((latest, date)) => {
                println!("latest version {}, published {}", latest.release().bold(), date);
                let local = VersionIdentifier::from_release_str(TOOL_VERSION);
                if let Some(advice) = local.and_then(|local| upgrade_advice(&local, &latest)) {
                    notice(format!("{} Download the newest nodelab release.", advice));
                }
                ControlFlow::Continue(())
            }
            None => {
                head_error = Some(line.to_string());
                ControlFlow::Break(())
            }
        }
    })?;

    if let Some(line) = head_error {
        return Err(anyhow!(
            "{} does not start with 'v<version> <date>' (got '{}')",
            url,
            line
        ));
    }
    Ok(())
}

/// `v0.2.0 2016-06-01` -> (0.2.0, "2016-06-01")
fn parse_manifest_head(line: &str) -> Option<(VersionIdentifier, &str)> {
    let mut fields = line.split_whitespace();
    let version = fields.next()?.strip_prefix('v')?;
    let date = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    Some((VersionIdentifier::from_release_str(version)?, date))
}

fn upgrade_advice(local: &VersionIdentifier, latest: &VersionIdentifier) -> Option<&'static str> {
    if latest.major != local.major {
        return (latest.major > local.major).then_some("must be upgraded.");
    }
    if latest.minor != local.minor {
        return (latest.minor > local.minor).then_some("suggest to upgrade.");
    }
    (latest.patch > local.patch).then_some("optional upgrade.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionIdentifier {
        VersionIdentifier::from_release_str(s).unwrap()
    }

    #[test]
    fn test_parse_manifest_head() {
        let (version, date) = parse_manifest_head("v0.2.0 2016-06-01").unwrap();
        assert_eq!(version, v("0.2.0"));
        assert_eq!(date, "2016-06-01");

        assert!(parse_manifest_head("0.2.0 2016-06-01").is_none());
        assert!(parse_manifest_head("v0.2.0").is_none());
        assert!(parse_manifest_head("v0.2 2016-06-01").is_none());
    }

    #[test]
    fn test_upgrade_advice_by_component() {
        assert_eq!(upgrade_advice(&v("0.1.0"), &v("1.0.0")), Some("must be upgraded."));
        assert_eq!(upgrade_advice(&v("0.1.9"), &v("0.2.0")), Some("suggest to upgrade."));
        assert_eq!(upgrade_advice(&v("0.1.0"), &v("0.1.1")), Some("optional upgrade."));
        assert_eq!(upgrade_advice(&v("0.1.1"), &v("0.1.1")), None);
        assert_eq!(upgrade_advice(&v("0.2.0"), &v("0.1.5")), None);
    }
}
