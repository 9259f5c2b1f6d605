// ABOUTME: Explicit runtime configuration for the relay.
// ABOUTME: Resolves the invoking identity once and carries key and known_hosts locations.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default timeout for establishing a backend connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The invoking user, as far as it can be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user: Option<String>,
    pub home: Option<PathBuf>,
}

impl Identity {
    pub fn new(user: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            user: Some(user.into()),
            home: Some(home.into()),
        }
    }

    /// Resolve from `USER` (or `LOGNAME`) and `HOME`. Empty values count as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        Self {
            user: var("USER").or_else(|| var("LOGNAME")),
            home: var("HOME").map(PathBuf::from),
        }
    }

    /// `<home>/.ssh`, if the home directory is known.
    pub fn ssh_dir(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|home| home.join(".ssh"))
    }
}

/// Configuration shared by every connection the relay makes.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub identity: Identity,
    /// Directory scanned for `id_*` private keys. Defaults to `<home>/.ssh`.
    pub key_dir: Option<PathBuf>,
    /// Known hosts database. Defaults to `<home>/.ssh/known_hosts`.
    pub known_hosts: Option<PathBuf>,
    /// Skip host key verification entirely. Off unless explicitly requested.
    pub insecure_accept_any_host_key: bool,
    pub connect_timeout: Duration,
}

impl RelayConfig {
    pub fn new(identity: Identity) -> Self {
        Self {
            key_dir: identity.ssh_dir(),
            known_hosts: identity.ssh_dir().map(|dir| dir.join("known_hosts")),
            identity,
            insecure_accept_any_host_key: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        Self::new(Identity::from_env())
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.identity.user = Some(user.into());
        self
    }

    pub fn key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    pub fn insecure_accept_any_host_key(mut self, insecure: bool) -> Self {
        self.insecure_accept_any_host_key = insecure;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn key_dir_path(&self) -> Option<&Path> {
        self.key_dir.as_deref()
    }

    pub fn known_hosts_path(&self) -> Option<&Path> {
        self.known_hosts.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_from_home() {
        let config = RelayConfig::new(Identity::new("alice", "/home/alice"));

        assert_eq!(config.key_dir_path(), Some(Path::new("/home/alice/.ssh")));
        assert_eq!(
            config.known_hosts_path(),
            Some(Path::new("/home/alice/.ssh/known_hosts"))
        );
        assert!(!config.insecure_accept_any_host_key);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn no_home_means_no_default_paths() {
        let config = RelayConfig::new(Identity::default());

        assert!(config.key_dir_path().is_none());
        assert!(config.known_hosts_path().is_none());
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = RelayConfig::new(Identity::new("alice", "/home/alice"))
            .user("bob")
            .key_dir("/keys")
            .known_hosts("/etc/ssh/ssh_known_hosts")
            .insecure_accept_any_host_key(true)
            .connect_timeout(Duration::from_secs(5));

        assert_eq!(config.identity.user.as_deref(), Some("bob"));
        assert_eq!(config.key_dir_path(), Some(Path::new("/keys")));
        assert_eq!(
            config.known_hosts_path(),
            Some(Path::new("/etc/ssh/ssh_known_hosts"))
        );
        assert!(config.insecure_accept_any_host_key);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn identity_from_env_reads_user_and_home() {
        temp_env::with_vars(
            [
                ("USER", Some("carol")),
                ("LOGNAME", None),
                ("HOME", Some("/home/carol")),
            ],
            || {
                let identity = Identity::from_env();
                assert_eq!(identity, Identity::new("carol", "/home/carol"));
            },
        );
    }

    #[test]
    fn identity_falls_back_to_logname() {
        temp_env::with_vars(
            [
                ("USER", None),
                ("LOGNAME", Some("dave")),
                ("HOME", None::<&str>),
            ],
            || {
                let identity = Identity::from_env();
                assert_eq!(identity.user.as_deref(), Some("dave"));
                assert!(identity.home.is_none());
            },
        );
    }

    #[test]
    fn empty_user_is_unresolved() {
        temp_env::with_vars([("USER", Some("")), ("LOGNAME", None)], || {
            assert!(Identity::from_env().user.is_none());
        });
    }
}
