//! HTTP client construction

use reqwest::blocking::Client;
use std::time::Duration;

/// Timeout for listings and SHASUMS files
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for binary and archive downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub const USER_AGENT: &str = concat!("nodelab/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}
