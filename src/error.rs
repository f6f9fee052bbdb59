//! Typed error kinds for the gateway core.
//!
//! Domain failures are a closed enum so callers can map them to HTTP
//! statuses and process exit codes without string matching. Authorization
//! rejections are deliberately detail-free: the same `InvalidAuth` surfaces
//! whether the secret was malformed, unknown, or under-privileged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Uniform authorization rejection. Carries no detail about which
    /// check failed so callers cannot distinguish an unknown token from
    /// insufficient privilege.
    #[error("invalid auth key")]
    InvalidAuth,

    /// Session tracker reported a port that is not an integer.
    #[error("could not parse session port")]
    MalformedPort,

    /// Session tracker reported a port outside `[start_port, 65535)`.
    #[error("session port outside the allowed range")]
    PortOutOfRange,

    /// A privileged external script exited nonzero or could not be
    /// spawned. Captured stdout/stderr never travel with the error; they
    /// go to tracing at debug level only.
    #[error("external command failed: {script}")]
    CommandFailed { script: String },

    /// An as-user tracker script produced no output where a value was
    /// required.
    #[error("session tracker returned no {what}")]
    BlankOutput { what: &'static str },

    /// Token store file does not exist. The process has never been set up.
    #[error("token store not found; run `devgate setup` first")]
    StoreNotSetUp,

    /// Token store file exists but is blank. Distinct from `StoreNotSetUp`
    /// so operators can tell a broken store from a missing one.
    #[error("token store is blank; delete it and run `devgate setup` again")]
    StoreBlank,

    #[error("token store is not valid JSON")]
    StoreCorrupt(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for startup failures. Missing and blank stores
    /// exit with distinct codes so init scripts can react differently to
    /// "never set up" and "set up but broken".
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::StoreNotSetUp => 3,
            Error::StoreBlank => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_exit_codes_are_distinct() {
        assert_ne!(
            Error::StoreNotSetUp.exit_code(),
            Error::StoreBlank.exit_code()
        );
    }

    #[test]
    fn generic_failures_exit_one() {
        assert_eq!(Error::MalformedPort.exit_code(), 1);
        assert_eq!(
            Error::CommandFailed {
                script: "id".into()
            }
            .exit_code(),
            1
        );
    }
}
