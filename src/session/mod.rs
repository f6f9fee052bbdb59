//! Per-user development session plumbing.
//!
//! The session service itself (the process actually listening on the
//! assigned port) is an external collaborator; this module drives its
//! lifecycle scripts and validates what they report back. The port check
//! is the load-bearing part: a compromised or buggy tracker must not be
//! able to steer a caller onto a reserved or unintended port, so values
//! outside `[start_port, 65535)` are a hard failure, never clamped.

use crate::error::{Error, Result};
use crate::exec::{scripts, CommandExecutor};
use std::path::Path;
use std::sync::Arc;

/// Exclusive upper bound for session ports.
const MAX_PORT: i64 = 65535;

/// Validate a port value reported by the session tracker. Unparsable
/// input is [`Error::MalformedPort`]; anything outside
/// `[start_port, 65535)` is [`Error::PortOutOfRange`].
pub fn validate_port(raw: &str, start_port: u16) -> Result<u16> {
    let port: i64 = raw.trim().parse().map_err(|_| Error::MalformedPort)?;
    if port < i64::from(start_port) || port >= MAX_PORT {
        return Err(Error::PortOutOfRange);
    }
    Ok(port as u16)
}

/// Seed the port counter file with the start port when absent. The file
/// is owned by the port-allocation scripts; the gateway never reads or
/// advances it. Returns true if a file was created.
pub fn ensure_port_counter(path: &Path, start_port: u16) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, start_port.to_string())?;
    Ok(true)
}

/// What the HTTP layer needs to route a caller into their session:
/// the session auth hash (cookie value) and the validated port.
#[derive(Debug, Clone)]
pub struct LaunchInfo {
    pub session_hash: String,
    pub port: u16,
}

/// Drives the session lifecycle scripts for one launch request.
#[derive(Clone)]
pub struct SessionLauncher {
    executor: Arc<dyn CommandExecutor>,
    start_port: u16,
}

impl SessionLauncher {
    pub fn new(executor: Arc<dyn CommandExecutor>, start_port: u16) -> Self {
        Self {
            executor,
            start_port,
        }
    }

    /// Initialise (or refresh) the user's session service, then read back
    /// its auth hash and assigned port. Any nonzero init exit, blank
    /// tracker output, or invalid port aborts the launch.
    pub async fn launch(&self, username: &str) -> Result<LaunchInfo> {
        let init = self
            .executor
            .run(&[scripts::INIT_SESSION, username], None)
            .await?;
        if !init.success() {
            tracing::warn!(%username, "session initialisation exited nonzero");
            return Err(Error::CommandFailed {
                script: scripts::INIT_SESSION.into(),
            });
        }

        let session_hash = self
            .executor
            .run(&[scripts::SESSION_HASH], Some(username))
            .await?
            .stdout_trimmed();
        if session_hash.is_empty() {
            return Err(Error::BlankOutput {
                what: "session hash",
            });
        }

        let raw_port = self
            .executor
            .run(&[scripts::SESSION_PORT], Some(username))
            .await?
            .stdout_trimmed();
        if raw_port.is_empty() {
            return Err(Error::BlankOutput {
                what: "session port",
            });
        }
        let port = validate_port(&raw_port, self.start_port)?;

        Ok(LaunchInfo { session_hash, port })
    }
}
