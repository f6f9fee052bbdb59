//! Secret generation and one-way token derivation.
//!
//! A *secret* is the bearer credential shown to an operator exactly once;
//! a *token* is its SHA-256 digest and the only form that is ever
//! persisted. There is no decode direction: losing a secret means issuing
//! a new one.

use rand::rand_core::TryRng;
use rand::rngs::SysRng;
use sha2::{Digest, Sha256};

/// Secret length in characters after base64url encoding.
pub const SECRET_LEN: usize = 64;

/// Raw entropy per secret: 48 bytes = 384 bits, encoding to exactly 64
/// base64url characters.
const SECRET_BYTES: usize = 48;

/// Generate a fresh 64-character URL-safe secret from the OS CSPRNG.
pub fn generate_secret() -> String {
    use base64::Engine;
    let mut bytes = [0u8; SECRET_BYTES];
    SysRng
        .try_fill_bytes(&mut bytes)
        .expect("OS CSPRNG failed to provide entropy");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the stable storage token for a secret: single-pass SHA-256,
/// hex-encoded. Secrets are already high-entropy, so no stretching.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_sixty_four_url_safe_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn secrets_do_not_repeat() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn hashing_is_deterministic_and_stable() {
        let token = hash_secret("fixed-input");
        assert_eq!(token, hash_secret("fixed-input"));
        // SHA-256 hex digest
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_secrets_hash_differently() {
        assert_ne!(hash_secret("one"), hash_secret("two"));
    }
}
