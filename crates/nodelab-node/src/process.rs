//! Terminating running node processes

use std::process::Command;
use thiserror::Error;

pub trait ProcessKiller {
    /// Terminates every process whose image is `image`, e.g. `node.exe`.
    /// Finding no such process is not an error.
    fn kill_all(&self, image: &str) -> Result<(), KillError>;
}

impl<T: ProcessKiller + ?Sized> ProcessKiller for &T {
    fn kill_all(&self, image: &str) -> Result<(), KillError> {
        (**self).kill_all(image)
    }
}

/// `taskkill /f /im <image>` on Windows, `pkill -x <image>` elsewhere
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessKiller;

#[cfg(windows)]
const NO_MATCH_CODES: &[i32] = &[128];
#[cfg(not(windows))]
const NO_MATCH_CODES: &[i32] = &[1];

impl ProcessKiller for SystemProcessKiller {
    fn kill_all(&self, image: &str) -> Result<(), KillError> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("taskkill");
            c.args(["/f", "/im", image]);
            c
        } else {
            let mut c = Command::new("pkill");
            c.args(["-x", image]);
            c
        };

        let output = command.output().map_err(KillError::Spawn)?;
        match output.status.code() {
            Some(0) => Ok(()),
            Some(code) if NO_MATCH_CODES.contains(&code) => {
                tracing::debug!(image, "no running process matched");
                Ok(())
            }
            code => Err(KillError::Failed {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum KillError {
    #[error("PROCESS_KILL_SPAWN: could not run the termination command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("PROCESS_KILL_FAILED: termination command exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}
