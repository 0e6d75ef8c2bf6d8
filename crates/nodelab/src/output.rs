use colored::Colorize;
use std::fmt::Display;

pub fn success(msg: impl Display) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn notice(msg: impl Display) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn failure(msg: impl Display) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}
