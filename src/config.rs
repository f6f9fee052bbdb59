//! Environment-driven configuration.
//!
//! Built once at startup and passed by `Arc` into every component; no
//! ambient globals. Each variable falls back to its default when unset,
//! blank, or unparsable.

use std::path::PathBuf;

/// Default minimum accepted password length.
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 5;

/// Default port the gateway itself listens on.
const DEFAULT_BIND_PORT: u16 = 8999;

/// Default lower bound for valid session ports. Session trackers report
/// ports in `[start_port, 65535)`.
const DEFAULT_START_PORT: u16 = 9000;

/// Default hostname used to build externally visible login URLs.
const DEFAULT_HOSTNAME: &str = "127.0.0.1";

/// On-disk token store: a single JSON object, hashed token → username.
const TOKEN_STORE_LOCATION: &str = "./tokens.json";

/// Port counter file owned by the port-allocation scripts. The gateway
/// only seeds it with the start port when absent.
const PORT_COUNTER_LOCATION: &str = "./lastport.txt";

/// Runtime configuration, resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum accepted password length (`PASSWORD_MIN_LENGTH`).
    pub password_min_length: usize,
    /// Port the HTTP gateway binds (`BIND_PORT`).
    pub bind_port: u16,
    /// Lower bound for valid session ports (`START_PORT`).
    pub start_port: u16,
    /// Hostname used in generated login URLs (`HOSTNAME`).
    pub hostname: String,
    /// Path of the JSON token store.
    pub token_store_path: PathBuf,
    /// Path of the port counter file.
    pub port_counter_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            bind_port: DEFAULT_BIND_PORT,
            start_port: DEFAULT_START_PORT,
            hostname: DEFAULT_HOSTNAME.to_string(),
            token_store_path: PathBuf::from(TOKEN_STORE_LOCATION),
            port_counter_path: PathBuf::from(PORT_COUNTER_LOCATION),
        }
    }
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            password_min_length: env_parsed("PASSWORD_MIN_LENGTH", DEFAULT_PASSWORD_MIN_LENGTH),
            bind_port: env_parsed("BIND_PORT", DEFAULT_BIND_PORT),
            start_port: env_parsed("START_PORT", DEFAULT_START_PORT),
            hostname: env_or("HOSTNAME", DEFAULT_HOSTNAME),
            token_store_path: PathBuf::from(TOKEN_STORE_LOCATION),
            port_counter_path: PathBuf::from(PORT_COUNTER_LOCATION),
        }
    }

    /// Base of every externally visible URL, e.g. `http://127.0.0.1`.
    pub fn url_base(&self) -> String {
        format!("http://{}", self.hostname)
    }

    /// Ready-to-use login URL embedding the (URL-encoded) secret.
    pub fn login_url(&self, secret: &str) -> String {
        format!("{}/user?key={}", self.url_base(), urlencoding::encode(secret))
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn env_parsed<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key, %value, %default, "unparsable value, using default");
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.password_min_length, 5);
        assert_eq!(config.bind_port, 8999);
        assert_eq!(config.start_port, 9000);
        assert_eq!(config.hostname, "127.0.0.1");
    }

    #[test]
    fn login_url_encodes_the_secret() {
        let config = Config::default();
        let url = config.login_url("a+b/c=");
        assert_eq!(url, "http://127.0.0.1/user?key=a%2Bb%2Fc%3D");
    }

    #[test]
    fn url_base_uses_hostname() {
        let config = Config {
            hostname: "gateway.example.org".into(),
            ..Config::default()
        };
        assert_eq!(config.url_base(), "http://gateway.example.org");
    }
}
