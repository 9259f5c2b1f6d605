// ABOUTME: SSH-specific error types.
// ABOUTME: Covers key discovery, host key policy, transport, authentication and forwarding failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no key directory configured and the home directory could not be resolved")]
    NoKeyDirectory,

    #[error("failed to read key directory {path}: {source}")]
    KeyDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no known_hosts file configured and the home directory could not be resolved")]
    NoKnownHosts,

    #[error("failed to open known hosts database {path}: {source}")]
    KnownHosts {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transport to {host} failed: {reason}")]
    Transport { host: String, reason: String },

    #[error("host key for {host} was rejected")]
    HostKeyRejected { host: String },

    #[error("authentication as {user}@{host} failed after offering {offered} key(s)")]
    AuthenticationFailed {
        user: String,
        host: String,
        offered: usize,
    },

    #[error("connecting to {host} timed out after {after:?}")]
    Timeout { host: String, after: Duration },

    #[error("forwarding to {destination} through {host} failed: {source}")]
    Forward {
        host: String,
        destination: String,
        #[source]
        source: russh::Error,
    },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}

impl Error {
    /// True for failures of the authenticated transport phase, as opposed to
    /// local setup or the forwarding request.
    pub fn is_transport_phase(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::HostKeyRejected { .. }
                | Error::AuthenticationFailed { .. }
                | Error::Timeout { .. }
                | Error::Protocol(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
