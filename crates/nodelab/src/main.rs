mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "NODELAB_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Install { versions, global } => {
            commands::install::run(versions, global, cli.verbose)
        }
        Commands::Use { version } => commands::use_version::run(version, cli.verbose),
        Commands::Ls {
            remote,
            limit,
            iojs,
        } => {
            if remote {
                commands::ls::run_remote(limit, iojs, cli.verbose)
            } else {
                commands::ls::run_local(cli.verbose)
            }
        }
        Commands::Uninstall { version } => commands::uninstall::run(version, cli.verbose),
        Commands::NodeVersion { which, remote } => {
            commands::node_version::run(which, remote, cli.verbose)
        }
        Commands::Update { target: _, global } => commands::update::run(global, cli.verbose),
        Commands::Version { remote } => commands::version::run(remote, cli.verbose),
        Commands::Config { key, value, reset } => {
            commands::config::run(key, value, reset, cli.verbose)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout is reserved for command output
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
