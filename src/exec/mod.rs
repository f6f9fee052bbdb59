//! Privileged command execution.
//!
//! Every OS-level mutation (account creation, password change, SSH key
//! install, session service control) happens in external scripts invoked
//! through the narrow [`CommandExecutor`] seam. The gateway itself never
//! embeds privilege logic: when a call must run as a specific user the
//! executor prefixes `sudo -u <user>`, otherwise the invoking process's
//! (expected root) identity applies.
//!
//! Keeping the seam a trait lets every consumer be tested against a
//! scripted fake instead of a live system.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// External script contracts, relative to the working directory.
///
/// `asroot/` scripts run with the gateway's own (root) identity,
/// `asuser/` scripts are always invoked with `as_user` set, and `util/`
/// scripts are identity-neutral checks.
pub mod scripts {
    /// Create and prepare an OS account: `initialise-user.sh <user>`.
    pub const INITIALISE_USER: &str = "./scripts/asroot/initialise-user.sh";
    /// Set an account password: `update-password.sh <user> <password>`.
    pub const UPDATE_PASSWORD: &str = "./scripts/asroot/update-password.sh";
    /// Start or refresh the per-user session service: `init-session.sh <user>`.
    pub const INIT_SESSION: &str = "./scripts/asroot/init-session.sh";
    /// Emit a fresh public key on stdout after installing the private half.
    pub const GEN_SSH_KEY: &str = "./scripts/asuser/gen-ssh-key.sh";
    /// Emit the running session's auth hash on stdout.
    pub const SESSION_HASH: &str = "./scripts/asuser/session-hash.sh";
    /// Emit the session's assigned port on stdout.
    pub const SESSION_PORT: &str = "./scripts/asuser/session-port.sh";
    /// Exit 0 iff the named user is in the administrative group.
    pub const HAS_SUDO: &str = "./scripts/util/has-sudo.sh";
}

/// Captured result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; `-1` when terminated by a signal.
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stdout as UTF-8 with surrounding whitespace removed. Scripts in
    /// this contract emit a single plain value.
    pub fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Narrow capability interface for running privileged external commands.
///
/// Invocations are blocking from the caller's perspective and are never
/// retried; a nonzero exit is surfaced once through the caller's own
/// error mapping.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `argv`, optionally impersonating `as_user` via `sudo -u`.
    async fn run(&self, argv: &[&str], as_user: Option<&str>) -> Result<CommandOutput>;
}

/// Production executor: spawns the command directly, or under
/// `sudo -u <user>` when an identity is given.
pub struct SudoExecutor;

#[async_trait]
impl CommandExecutor for SudoExecutor {
    async fn run(&self, argv: &[&str], as_user: Option<&str>) -> Result<CommandOutput> {
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::CommandFailed {
                script: "<empty argv>".into(),
            });
        };

        let output = match as_user {
            Some(user) => {
                Command::new("sudo")
                    .arg("-u")
                    .arg(user)
                    .args(argv)
                    .output()
                    .await
            }
            None => Command::new(program).args(args).output().await,
        }
        .map_err(|err| {
            tracing::warn!(script = %program, %err, "failed to spawn external command");
            Error::CommandFailed {
                script: (*program).to_string(),
            }
        })?;

        let status = output.status.code().unwrap_or(-1);
        if status != 0 {
            tracing::debug!(
                script = %program,
                status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "external command exited nonzero"
            );
        }

        Ok(CommandOutput {
            status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted executor for tests: canned responses per program path,
    //! every invocation recorded.

    use super::{CommandExecutor, CommandOutput};
    use crate::error::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub argv: Vec<String>,
        pub as_user: Option<String>,
    }

    #[derive(Default)]
    pub struct FakeExecutor {
        responses: Mutex<HashMap<String, CommandOutput>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make `program` exit nonzero.
        pub fn fail_for(self, program: &str) -> Self {
            self.responses.lock().insert(
                program.to_string(),
                CommandOutput {
                    status: 1,
                    stdout: Vec::new(),
                    stderr: b"scripted failure".to_vec(),
                },
            );
            self
        }

        /// Make `program` succeed with the given stdout.
        pub fn stdout_for(self, program: &str, stdout: &str) -> Self {
            self.responses.lock().insert(
                program.to_string(),
                CommandOutput {
                    status: 0,
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: Vec::new(),
                },
            );
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().clone()
        }

        /// True iff any recorded invocation mentioned `needle` in argv.
        pub fn saw_argument(&self, needle: &str) -> bool {
            self.calls
                .lock()
                .iter()
                .any(|call| call.argv.iter().any(|arg| arg == needle))
        }
    }

    #[async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn run(&self, argv: &[&str], as_user: Option<&str>) -> Result<CommandOutput> {
            self.calls.lock().push(RecordedCall {
                argv: argv.iter().map(|arg| arg.to_string()).collect(),
                as_user: as_user.map(str::to_string),
            });
            let canned = argv.first().and_then(|program| {
                self.responses.lock().get(*program).cloned()
            });
            Ok(canned.unwrap_or(CommandOutput {
                status: 0,
                stdout: Vec::new(),
                stderr: Vec::new(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let result = SudoExecutor.run(&[], None).await;
        assert!(matches!(result, Err(Error::CommandFailed { .. })));
    }

    #[tokio::test]
    async fn fake_records_calls_and_replays_stdout() {
        use fake::FakeExecutor;
        let exec = FakeExecutor::new().stdout_for("/bin/probe", "  9001\n");
        let out = exec.run(&["/bin/probe", "alice"], Some("alice")).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout_trimmed(), "9001");
        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].as_user.as_deref(), Some("alice"));
        assert!(exec.saw_argument("alice"));
    }
}
