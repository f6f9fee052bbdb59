//! Identity validation and privilege resolution.
//!
//! Identities are OS account names, never materialized as stored objects:
//! existence and admin membership are checked live against the host on
//! every privileged decision. Well-formedness is checked first and
//! malformed names short-circuit to `false` before any external command
//! runs, so user-supplied strings can never become arguments to a
//! privileged script.

pub mod accounts;

pub use accounts::AccountManager;

use crate::exec::{scripts, CommandExecutor};
use std::sync::Arc;

/// True iff `username` is non-empty ASCII letters and digits only, the
/// character set that is safe to hand to account-management scripts.
pub fn is_well_formed(username: &str) -> bool {
    !username.is_empty() && username.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Resolves identity attributes through the command executor.
#[derive(Clone)]
pub struct IdentityResolver {
    executor: Arc<dyn CommandExecutor>,
}

impl IdentityResolver {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Whether `username` names a real account: well-formed and `id`
    /// exits zero.
    pub async fn exists(&self, username: &str) -> bool {
        if !is_well_formed(username) {
            return false;
        }
        self.check(&["id", username]).await
    }

    /// Whether `username` is in the administrative group. Note: this does
    /// not also require [`exists`](Self::exists); callers must not assume
    /// one implies the other, although a well-formed but non-existent name
    /// fails the group check anyway.
    pub async fn is_admin(&self, username: &str) -> bool {
        if !is_well_formed(username) {
            return false;
        }
        self.check(&[scripts::HAS_SUDO, username]).await
    }

    /// Run a zero-exit check, failing closed on execution errors.
    async fn check(&self, argv: &[&str]) -> bool {
        match self.executor.run(argv, None).await {
            Ok(output) => output.success(),
            Err(err) => {
                tracing::warn!(%err, "identity check could not run, treating as negative");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeExecutor;

    #[test]
    fn well_formed_accepts_ascii_alphanumerics() {
        assert!(is_well_formed("alice"));
        assert!(is_well_formed("Bob2"));
        assert!(is_well_formed("123"));
    }

    #[test]
    fn well_formed_rejects_everything_else() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("bad user"));
        assert!(!is_well_formed("semi;colon"));
        assert!(!is_well_formed("dash-user"));
        assert!(!is_well_formed("under_score"));
        assert!(!is_well_formed("tabby\t"));
        assert!(!is_well_formed("évariste"));
    }

    #[tokio::test]
    async fn exists_follows_id_exit_status() {
        let exec = Arc::new(FakeExecutor::new());
        let resolver = IdentityResolver::new(exec);
        assert!(resolver.exists("alice").await);

        let exec = Arc::new(FakeExecutor::new().fail_for("id"));
        let resolver = IdentityResolver::new(exec);
        assert!(!resolver.exists("alice").await);
    }

    #[tokio::test]
    async fn is_admin_follows_group_check_exit_status() {
        let exec = Arc::new(FakeExecutor::new());
        let resolver = IdentityResolver::new(exec);
        assert!(resolver.is_admin("alice").await);

        let exec = Arc::new(FakeExecutor::new().fail_for(crate::exec::scripts::HAS_SUDO));
        let resolver = IdentityResolver::new(exec);
        assert!(!resolver.is_admin("alice").await);
    }

    #[tokio::test]
    async fn malformed_names_never_reach_the_executor() {
        let exec = Arc::new(FakeExecutor::new());
        let resolver = IdentityResolver::new(Arc::clone(&exec) as Arc<dyn CommandExecutor>);

        assert!(!resolver.exists("bad user").await);
        assert!(!resolver.is_admin("`rm -rf`").await);
        assert!(!resolver.is_admin("").await);

        assert!(exec.calls().is_empty());
    }
}
