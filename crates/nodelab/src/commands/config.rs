//! `nodelab config` - show and edit config.toml

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::context::Context;
use crate::output::success;
use nodelab_core::config::{self, Config, ConfigKey};

/// Execute `nodelab config [key] [value] [--reset]`
pub fn run(key: Option<String>, value: Option<String>, reset: bool, verbose: bool) -> Result<()> {
    let ctx = Context::new(verbose)?;

    if reset {
        let config = config::update(&ctx.config_path, |current| {
            *current = current.reset();
            Ok(())
        })?;
        success("Configuration reset to defaults");
        print_all(&ctx.config_path, &config);
        return Ok(());
    }

    match (key, value) {
        (None, _) => print_all(&ctx.config_path, &ctx.config),
        (Some(key), None) => {
            let key: ConfigKey = key.parse()?;
            println!("{}", display_value(&ctx.config, key));
        }
        (Some(key), Some(value)) => {
            let key: ConfigKey = key.parse()?;
            let config = config::update(&ctx.config_path, |current| current.set(key, &value))?;
            success(format!("{} = {}", key, display_value(&config, key)));
        }
    }
    Ok(())
}

fn display_value(config: &Config, key: ConfigKey) -> String {
    config
        .get(key)
        .unwrap_or_else(|| "(unset)".dimmed().to_string())
}

fn print_all(path: &Path, config: &Config) {
    println!("config file is {}", path.display());
    for key in ConfigKey::ALL {
        println!("{:<16}{}", key.as_str(), display_value(config, key));
    }
}
