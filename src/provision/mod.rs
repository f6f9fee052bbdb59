//! Batch identity provisioning.
//!
//! Drives creation of many accounts at once, with optional fresh secret
//! issuance and optional purge of any tokens the target identities
//! already hold. Purging happens before anything is issued, so a
//! regenerated identity never has two live credentials at the same time.
//!
//! Candidates that fail the username character check are dropped before
//! any external command runs, but still count toward `total` so the
//! batch report shows how many lines were submitted versus accepted.

use crate::auth::{keys, TokenStore};
use crate::error::Result;
use crate::identity::{self, AccountManager};
use std::collections::HashSet;
use std::sync::Arc;

/// One parsed batch request.
#[derive(Debug, Clone)]
pub struct BulkRequest {
    /// Newline-separated candidate usernames, as submitted.
    pub usernames: String,
    /// Issue a fresh secret (and login URL) per accepted identity.
    pub generate_url: bool,
    /// Remove the accepted identities' existing tokens first.
    pub purge_existing: bool,
}

/// A freshly issued credential. The secret appears here, in the batch
/// response, exactly once and is never persisted.
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub secret: String,
}

/// Outcome of one batch run.
///
/// `successes` counts identities that passed the username filter, not
/// identities whose initialisation script succeeded; per-identity script
/// exits are logged but not reported. See DESIGN.md for the rationale.
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    /// Submitted candidate count, before filtering.
    pub total: usize,
    /// Accepted (well-formed) candidate count.
    pub successes: usize,
    pub credentials: Vec<Credential>,
}

impl BulkOutcome {
    /// One-line operator summary.
    pub fn summary(&self) -> String {
        format!("Created {}/{} users", self.successes, self.total)
    }

    /// CSV report of issued credentials: `username,url` header plus one
    /// login URL per credential, secrets URL-encoded.
    pub fn csv(&self, url_base: &str) -> String {
        let mut out = String::from("username,url");
        for credential in &self.credentials {
            out.push('\n');
            out.push_str(&format!(
                "{},{}/user?key={}",
                credential.username,
                url_base,
                urlencoding::encode(&credential.secret)
            ));
        }
        out
    }
}

/// Orchestrates account initialisation and token issuance for a batch.
#[derive(Clone)]
pub struct BulkProvisioner {
    store: Arc<TokenStore>,
    accounts: AccountManager,
}

impl BulkProvisioner {
    pub fn new(store: Arc<TokenStore>, accounts: AccountManager) -> Self {
        Self { store, accounts }
    }

    pub async fn run(&self, request: &BulkRequest) -> Result<BulkOutcome> {
        let candidates: Vec<String> = request
            .usernames
            .split('\n')
            .map(|line| line.trim().to_string())
            .collect();
        let total = candidates.len();

        let accepted: Vec<String> = candidates
            .into_iter()
            .filter(|name| identity::is_well_formed(name))
            .collect();

        if request.purge_existing {
            let targets: HashSet<String> = accepted.iter().cloned().collect();
            let removed = self.store.purge_by_usernames(&targets)?;
            tracing::info!(removed, "purged existing tokens before reissue");
        }

        let mut credentials = Vec::new();
        for username in &accepted {
            if !self.accounts.initialise(username).await? {
                tracing::warn!(%username, "account initialisation exited nonzero");
            }
            if request.generate_url {
                let secret = keys::generate_secret();
                self.store.insert(&keys::hash_secret(&secret), username)?;
                credentials.push(Credential {
                    username: username.clone(),
                    secret,
                });
            }
        }

        tracing::info!(
            total,
            accepted = accepted.len(),
            issued = credentials.len(),
            "bulk provisioning finished"
        );
        Ok(BulkOutcome {
            total,
            successes: accepted.len(),
            credentials,
        })
    }
}
