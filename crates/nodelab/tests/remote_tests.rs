//! Integration tests for commands that talk to a registry
//!
//! Every test serves its registry below a unique prefix of the shared mock
//! server, so `latest/` and `index.json` never collide between tests.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo_bin;
use mockito::{Matcher, Mock};
use nodelab_testkit::{
    get_shared_mock_server, install_fake_version, npm_zip, shared_mock_registry_url,
    shasums_listing, with_isolated_nodelab_env, write_registry_config,
};
use predicates::prelude::*;
use std::fs;
use std::process::Command;

fn nodelab() -> Command {
    Command::new(cargo_bin!("nodelab"))
}

fn registry(prefix: &str) -> String {
    format!("{}{}/", shared_mock_registry_url(), prefix)
}

/// Binary paths for every host the tests may run on
const ALL_HOST_BINARIES: &[&str] = &[
    "win-x64/node.exe",
    "win-x86/node.exe",
    "linux-x64/node",
    "linux-arm64/node",
    "darwin-x64/node",
    "darwin-arm64/node",
];

fn fake_binary_body(version: &str) -> String {
    format!("#!/bin/sh\necho v{}\n", version)
}

/// SHASUMS listing plus a binary for any host under `/<prefix>/v<version>/`
fn mock_release(prefix: &str, version: &str) -> Vec<Mock> {
    let mut server = get_shared_mock_server();
    vec![
        server
            .mock("GET", format!("/{}/v{}/SHASUMS256.txt", prefix, version).as_str())
            .with_status(200)
            .with_body(shasums_listing(ALL_HOST_BINARIES))
            .create(),
        server
            .mock(
                "GET",
                Matcher::Regex(format!(
                    r"^/{}/v{}/[a-z0-9-]+/node(\.exe)?$",
                    prefix,
                    regex_escape(version)
                )),
            )
            .with_status(200)
            .with_body(fake_binary_body(version))
            .create(),
    ]
}

fn mock_latest(prefix: &str, version: &str) -> Mock {
    get_shared_mock_server()
        .mock("GET", format!("/{}/latest/SHASUMS256.txt", prefix).as_str())
        .with_status(200)
        .with_body(shasums_listing(&[
            format!("node-v{}-linux-x64.tar.gz", version).as_str(),
            format!("node-v{}.tar.gz", version).as_str(),
        ]))
        .create()
}

fn regex_escape(version: &str) -> String {
    version.replace('.', r"\.")
}

#[test]
fn test_install_downloads_binary() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("install-one"));
        let _mocks = mock_release("install-one", "6.1.0");

        nodelab()
            .args(["install", "6.1.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed node 6.1.0"));

        let binary = env.node_root.join("6.1.0").join(if cfg!(windows) { "node.exe" } else { "node" });
        assert_eq!(fs::read_to_string(binary).unwrap(), fake_binary_body("6.1.0"));
    });
}

#[test]
fn test_install_reports_invalid_token_and_continues() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("install-mixed"));
        let _mocks = mock_release("install-mixed", "6.0.0");

        nodelab()
            .args(["install", "six", "6.0.0"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Installed node 6.0.0"))
            .stderr(predicate::str::contains("six"));

        assert!(env.node_root.join("6.0.0").is_dir());
    });
}

#[test]
fn test_install_present_version_needs_no_registry() {
    with_isolated_nodelab_env(|env| {
        // nothing is mocked under this prefix
        write_registry_config(&env.home, &registry("install-offline"));
        install_fake_version(&env.node_root, "4.4.4-x86", "4.4.4");

        nodelab()
            .args(["install", "4.4.4-x86"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already installed"));
    });
}

#[test]
fn test_install_missing_release_fails() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("install-missing"));

        nodelab()
            .args(["install", "9.9.9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("REGISTRY_UNREACHABLE"));

        assert!(!env.node_root.join("9.9.9").exists());
    });
}

#[test]
fn test_install_latest_records_pointer() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("install-latest"));
        let _latest = mock_latest("install-latest", "6.2.0");
        let _mocks = mock_release("install-latest", "6.2.0");

        nodelab()
            .args(["install", "latest"])
            .assert()
            .success()
            .stdout(predicate::str::contains("latest_version: unknown -> 6.2.0"));

        let content = fs::read_to_string(env.config_file()).unwrap();
        assert!(content.contains("latest_version = \"6.2.0\""));
        assert!(content.contains("global_version = \"unknown\""));
    });
}

#[cfg(unix)]
#[test]
fn test_install_global_activates() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("install-global"));
        let _mocks = mock_release("install-global", "5.12.0");

        nodelab()
            .args(["install", "5.12.0", "-g"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Now using node 5.12.0"));

        assert!(env.node_root.join("node").is_file());
        let content = fs::read_to_string(env.config_file()).unwrap();
        assert!(content.contains("global_version = \"5.12.0\""));
    });
}

#[test]
fn test_node_version_latest_remote_fills_unknown_pointer() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("node-version-remote"));
        let _latest = mock_latest("node-version-remote", "6.2.1");

        nodelab()
            .args(["node-version", "latest", "--remote"])
            .assert()
            .success()
            .stdout(predicate::str::contains("remote latest version is 6.2.1"))
            .stdout(predicate::str::contains("latest version set to 6.2.1"));

        let content = fs::read_to_string(env.config_file()).unwrap();
        assert!(content.contains("latest_version = \"6.2.1\""));
    });
}

#[test]
fn test_update_installs_newer_remote() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("update-newer"));
        fs::write(
            env.config_file(),
            format!(
                "registry = \"{}\"\nlatest_version = \"5.0.0\"\n",
                registry("update-newer")
            ),
        )
        .unwrap();
        let _latest = mock_latest("update-newer", "6.3.0");
        let _mocks = mock_release("update-newer", "6.3.0");

        nodelab()
            .args(["update", "latest"])
            .assert()
            .success()
            .stdout(predicate::str::contains("latest version is now 6.3.0"));

        assert!(env.node_root.join("6.3.0").is_dir());
        let content = fs::read_to_string(env.config_file()).unwrap();
        assert!(content.contains("latest_version = \"6.3.0\""));
    });
}

#[test]
fn test_update_warns_when_local_is_newer() {
    with_isolated_nodelab_env(|env| {
        fs::write(
            env.config_file(),
            format!(
                "registry = \"{}\"\nlatest_version = \"7.0.0\"\n",
                registry("update-older")
            ),
        )
        .unwrap();
        let _latest = mock_latest("update-older", "6.2.1");

        nodelab()
            .args(["update"])
            .assert()
            .success()
            .stdout(predicate::str::contains("is newer than remote latest"));

        let content = fs::read_to_string(env.config_file()).unwrap();
        assert!(content.contains("latest_version = \"7.0.0\""));
    });
}

#[test]
fn test_ls_remote_lists_index() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("ls-remote"));
        let _index = get_shared_mock_server()
            .mock("GET", "/ls-remote/index.json")
            .with_status(200)
            .with_body(
                r#"[{"version":"v5.0.0","date":"2015-10-29","npm":"3.3.6","v8":"4.6.85.28"},
                    {"version":"v6.2.1","date":"2016-06-02","npm":"3.9.3","v8":"5.0.71.52"}]"#,
            )
            .create();

        let output = nodelab().args(["ls", "--remote"]).assert().success();
        let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
        let v6 = stdout.find("v6.2.1").unwrap();
        let v5 = stdout.find("v5.0.0").unwrap();
        assert!(v6 < v5, "newest first: {}", stdout);

        nodelab()
            .args(["ls", "--remote", "--limit", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("2016-06-02"))
            .stdout(predicate::str::contains("5.0.71.52"))
            .stdout(predicate::str::contains("v5.0.0").not());
    });
}

#[test]
fn test_install_npm_from_listing() {
    with_isolated_nodelab_env(|env| {
        write_registry_config(&env.home, &registry("npm-install"));
        let (_listing, _zip) = {
            let mut server = get_shared_mock_server();
            (
                server
                    .mock("GET", "/npm-install/npm/")
                    .with_status(200)
                    .with_body(
                        "<a href=\"npm-1.4.9.zip\">npm-1.4.9.zip</a>  01-May-2014 18:00  1\n\
                         <a href=\"npm-1.4.10.zip\">npm-1.4.10.zip</a>  02-Apr-2014 11:00  1\n",
                    )
                    .create(),
                server
                    .mock("GET", "/npm-install/npm/npm-1.4.9.zip")
                    .with_status(200)
                    .with_body(npm_zip("1.4.9"))
                    .create(),
            )
        };

        nodelab()
            .args(["install", "npm"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed npm 1.4.9"));

        assert!(env.node_root.join("npm.cmd").is_file());
        assert!(env.node_root.join("node_modules").join("npm").is_dir());

        nodelab()
            .args(["install", "npm"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already installed"));
    });
}

#[test]
fn test_version_remote_reads_manifest() {
    with_isolated_nodelab_env(|env| {
        let manifest_url = format!("{}manifest/version.txt", shared_mock_registry_url());
        fs::write(env.config_file(), format!("update_url = \"{}\"\n", manifest_url)).unwrap();
        let _manifest = get_shared_mock_server()
            .mock("GET", "/manifest/version.txt")
            .with_status(200)
            .with_body("v99.0.0 2026-01-01\nnew release notes\n")
            .create();

        nodelab()
            .args(["version", "--remote"])
            .assert()
            .success()
            .stdout(predicate::str::contains("99.0.0"))
            .stdout(predicate::str::contains("published 2026-01-01"))
            .stdout(predicate::str::contains("must be upgraded."))
            .stdout(predicate::str::contains("new release notes"));
    });
}
