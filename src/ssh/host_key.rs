// ABOUTME: Host key verification policy for SSH jump hosts.
// ABOUTME: Checks server keys against known_hosts unless insecure acceptance is opted into.

use super::error::{Error, Result};
use crate::config::RelayConfig;
use russh::keys::known_hosts::check_known_hosts_path;
use russh::keys::ssh_key;
use std::path::{Path, PathBuf};

/// How a jump host's server key is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept only keys recorded in this known_hosts file.
    KnownHosts(PathBuf),
    /// Accept every key. Only used when explicitly configured.
    AcceptAny,
}

impl HostKeyPolicy {
    /// Build the policy for one dial.
    ///
    /// The known_hosts file must exist and be readable; a policy that could
    /// never accept anything is reported up front instead of at handshake time.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        if config.insecure_accept_any_host_key {
            tracing::warn!("Host key verification is disabled; any SSH server key will be accepted");
            return Ok(HostKeyPolicy::AcceptAny);
        }

        let path = config.known_hosts_path().ok_or(Error::NoKnownHosts)?;
        Self::known_hosts(path)
    }

    /// Policy backed by the given known_hosts file, which must be readable.
    pub fn known_hosts(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::File::open(path).map_err(|source| Error::KnownHosts {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(HostKeyPolicy::KnownHosts(path.to_path_buf()))
    }

    /// Decide whether `key` is acceptable for `host:port`.
    pub fn verify(&self, host: &str, port: u16, key: &ssh_key::PublicKey) -> bool {
        let path = match self {
            HostKeyPolicy::AcceptAny => return true,
            HostKeyPolicy::KnownHosts(path) => path,
        };

        match check_known_hosts_path(host, port, key, path) {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(
                    "Host {}:{} not found in {}; rejecting its key",
                    host,
                    port,
                    path.display()
                );
                false
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    "Host key for {}:{} does not match {} line {}; possible man-in-the-middle",
                    host,
                    port,
                    path.display(),
                    line
                );
                false
            }
            Err(e) => {
                tracing::warn!("Failed to check host key for {}:{}: {}", host, port, e);
                false
            }
        }
    }
}
