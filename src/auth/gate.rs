//! The single authorization chokepoint.
//!
//! Every identity-scoped or privileged operation resolves its caller here
//! before acting; nothing else in the crate branches on a raw secret.

use super::{keys, TokenStore};
use crate::identity::IdentityResolver;
use std::sync::Arc;

/// Combines the token store and identity resolver to answer "does this
/// presented secret authorize this operation?".
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<TokenStore>,
    resolver: IdentityResolver,
}

impl AuthGate {
    pub fn new(store: Arc<TokenStore>, resolver: IdentityResolver) -> Self {
        Self { store, resolver }
    }

    /// Resolve a presented secret to a username, optionally requiring
    /// admin privilege. Returns `None` on any failure (absent or
    /// malformed secret, unknown token, store trouble, insufficient
    /// privilege) without distinguishing which.
    ///
    /// A secret containing a space is rejected outright: it can never be
    /// valid and must not travel further as a shell argument.
    pub async fn authorize(&self, secret: Option<&str>, require_admin: bool) -> Option<String> {
        let secret = secret?;
        if secret.is_empty() || secret.contains(' ') {
            return None;
        }

        let token = keys::hash_secret(secret);
        let username = match self.store.lookup(&token) {
            Ok(Some(username)) => username,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(%err, "token store unreadable during authorization");
                return None;
            }
        };

        if require_admin && !self.resolver.is_admin(&username).await {
            tracing::debug!("admin-gated request by non-admin identity");
            return None;
        }

        Some(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeExecutor;
    use crate::exec::scripts;
    use tempfile::TempDir;

    fn gate_with(exec: FakeExecutor) -> (TempDir, AuthGate, Arc<TokenStore>) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tokens.json");
        TokenStore::create_if_missing(&path).unwrap();
        let store = Arc::new(TokenStore::open(&path).unwrap());
        let resolver = IdentityResolver::new(Arc::new(exec));
        let gate = AuthGate::new(Arc::clone(&store), resolver);
        (tmp, gate, store)
    }

    #[tokio::test]
    async fn absent_and_empty_secrets_always_fail() {
        let (_tmp, gate, _store) = gate_with(FakeExecutor::new());
        assert_eq!(gate.authorize(None, false).await, None);
        assert_eq!(gate.authorize(Some(""), false).await, None);
        assert_eq!(gate.authorize(None, true).await, None);
    }

    #[tokio::test]
    async fn space_containing_secrets_always_fail() {
        let (_tmp, gate, store) = gate_with(FakeExecutor::new());
        // Even a store entry for the literal hash cannot make it pass.
        store
            .insert(&keys::hash_secret("has space"), "alice")
            .unwrap();
        assert_eq!(gate.authorize(Some("has space"), false).await, None);
    }

    #[tokio::test]
    async fn unknown_secret_fails() {
        let (_tmp, gate, _store) = gate_with(FakeExecutor::new());
        assert_eq!(gate.authorize(Some("neverissued"), false).await, None);
    }

    #[tokio::test]
    async fn issued_secret_resolves_to_its_username() {
        let (_tmp, gate, store) = gate_with(FakeExecutor::new());
        let secret = keys::generate_secret();
        store.insert(&keys::hash_secret(&secret), "alice").unwrap();

        let resolved = gate.authorize(Some(&secret), false).await;
        assert_eq!(resolved.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn admin_requirement_rejects_non_admins_but_not_plain_access() {
        let (_tmp, gate, store) = gate_with(FakeExecutor::new().fail_for(scripts::HAS_SUDO));
        let secret = keys::generate_secret();
        store.insert(&keys::hash_secret(&secret), "bob").unwrap();

        assert_eq!(gate.authorize(Some(&secret), false).await.as_deref(), Some("bob"));
        assert_eq!(gate.authorize(Some(&secret), true).await, None);
    }

    #[tokio::test]
    async fn admin_requirement_passes_for_admins() {
        let (_tmp, gate, store) = gate_with(FakeExecutor::new());
        let secret = keys::generate_secret();
        store.insert(&keys::hash_secret(&secret), "root1").unwrap();

        assert_eq!(gate.authorize(Some(&secret), true).await.as_deref(), Some("root1"));
    }
}
