//! CLI command structure using clap

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "nodelab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print debug logs (overridden by NODELAB_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install node versions (e.g. "6.2.1", "4.4.4-x86", "latest", "npm")
    Install {
        #[arg(required = true)]
        versions: Vec<String>,

        /// Make the installed version the global one (single version only)
        #[arg(short, long)]
        global: bool,
    },

    /// Switch the global node binary to an installed version
    Use {
        /// Version to activate, or "latest"
        version: String,
    },

    /// List installed versions
    Ls {
        /// List the releases published by the registry instead
        #[arg(short, long)]
        remote: bool,

        /// Show details for the newest N remote releases
        #[arg(long, requires = "remote")]
        limit: Option<usize>,

        /// Read the io.js registry
        #[arg(long, requires = "remote")]
        iojs: bool,
    },

    /// Remove an installed version, or npm
    Uninstall {
        /// Version to remove, or "npm"
        version: String,
    },

    /// Show the recorded latest and global versions
    NodeVersion {
        which: Option<PointerArg>,

        /// Compare the latest version with the registry
        #[arg(short, long)]
        remote: bool,
    },

    /// Install the newest remote release
    Update {
        #[arg(value_parser = ["latest"], default_value = "latest")]
        target: String,

        /// Also make it the global version
        #[arg(short, long)]
        global: bool,
    },

    /// Show the nodelab version
    Version {
        /// Check the update manifest for a newer nodelab
        #[arg(short, long)]
        remote: bool,
    },

    /// Show or change settings
    Config {
        /// Setting name, e.g. "registry"
        key: Option<String>,

        /// New value for the setting
        value: Option<String>,

        /// Restore defaults, keeping the latest and global versions
        #[arg(long, conflicts_with_all = ["key", "value"])]
        reset: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PointerArg {
    Global,
    Latest,
}
