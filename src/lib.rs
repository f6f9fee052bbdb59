//! devgate: multi-tenant access gateway for per-user development
//! sessions.
//!
//! Issues opaque bearer secrets to OS users, maps their one-way hashes
//! to identities, and uses that identity to authorize provisioning and
//! proxy-launch of a per-user development session on a dedicated port.
//!
//! Module map:
//! - [`exec`]: narrow seam for running privileged external scripts
//! - [`auth`]: secret/token codec, JSON token store, authorization gate
//! - [`identity`]: username validation, existence and admin checks,
//!   account operations
//! - [`session`]: session launch flow and port validation
//! - [`provision`]: batch account creation and credential issuance
//! - [`gateway`]: axum HTTP surface
//! - [`config`], [`error`], [`setup`]: ambient plumbing

pub mod auth;
pub mod config;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod identity;
pub mod provision;
pub mod session;
pub mod setup;
