//! Shared mockito server
//!
//! One server per test process. Tests register mocks under unique paths
//! (usually a distinct version number) and only hold the lock while
//! creating them.

use lazy_static::lazy_static;
use mockito::{Server, ServerGuard};
use std::sync::Mutex;

lazy_static! {
    pub static ref SHARED_MOCK_SERVER: Mutex<ServerGuard> = Mutex::new(Server::new());
}

/// Locks the shared server for mock setup
///
/// ```no_run
/// use nodelab_testkit::get_shared_mock_server;
///
/// let _mock = {
///     let mut server = get_shared_mock_server();
///     server.mock("GET", "/v6.2.1/SHASUMS256.txt").with_status(200).create()
/// };
/// ```
pub fn get_shared_mock_server() -> std::sync::MutexGuard<'static, ServerGuard> {
    SHARED_MOCK_SERVER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Base URL of the shared server with a trailing slash, usable as a registry
pub fn shared_mock_registry_url() -> String {
    format!("{}/", get_shared_mock_server().url())
}
