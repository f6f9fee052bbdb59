//! Bearer-secret authentication.
//!
//! Provides:
//! - Secret/token codec (opaque 64-char URL-safe secrets, SHA-256 hashed
//!   for storage; no JWT dependency, server-side lookup only)
//! - JSON-file token store with whole-file read-modify-write transactions
//! - The [`AuthGate`] chokepoint every privileged operation routes through
//!
//! ## Design Decisions
//! - Secrets are never persisted; only their SHA-256 digest is stored, so
//!   a leaked store cannot be replayed as credentials.
//! - Authorization failures are uniform: absent, malformed, unknown, and
//!   under-privileged secrets are indistinguishable to the caller.

pub mod gate;
pub mod keys;
pub mod store;

pub use gate::AuthGate;
pub use store::TokenStore;
