//! Account operations delegated to the privileged scripts.
//!
//! The gateway never mutates OS accounts itself; each operation is one
//! script invocation through the executor seam. Callers are expected to
//! have validated the username (see [`super::is_well_formed`]) before any
//! of these run.

use crate::error::{Error, Result};
use crate::exec::{scripts, CommandExecutor};
use std::sync::Arc;

/// Runs account-lifecycle scripts as root or as the target user.
#[derive(Clone)]
pub struct AccountManager {
    executor: Arc<dyn CommandExecutor>,
}

impl AccountManager {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Create and prepare the OS account. Returns whether the script
    /// exited zero; bulk provisioning records but does not currently act
    /// on a nonzero exit (the batch report counts filtered identities,
    /// not initialisation outcomes).
    pub async fn initialise(&self, username: &str) -> Result<bool> {
        let output = self
            .executor
            .run(&[scripts::INITIALISE_USER, username], None)
            .await?;
        Ok(output.success())
    }

    /// Set the account password.
    pub async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        let output = self
            .executor
            .run(&[scripts::UPDATE_PASSWORD, username, password], None)
            .await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                script: scripts::UPDATE_PASSWORD.into(),
            });
        }
        Ok(())
    }

    /// Install a fresh SSH key pair for the user and return the public
    /// half (the script prints it on stdout).
    pub async fn generate_ssh_key(&self, username: &str) -> Result<String> {
        let output = self
            .executor
            .run(&[scripts::GEN_SSH_KEY], Some(username))
            .await?;
        if !output.success() {
            return Err(Error::CommandFailed {
                script: scripts::GEN_SSH_KEY.into(),
            });
        }
        Ok(output.stdout_trimmed())
    }
}
