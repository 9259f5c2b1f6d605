// ABOUTME: Resolves destination strings into dialers and establishes backend connections.
// ABOUTME: Fills in the invoking user for SSH tunnels that do not name one.

use crate::config::RelayConfig;
use crate::destination::DestinationSpec;
use crate::dial::{Connection, DirectDialer, Dialer};
use crate::error::{Error, Result};
use crate::ssh::TunnelDialer;
use std::sync::Arc;

/// Turns a destination specification into an established backend connection.
#[derive(Debug, Clone)]
pub struct ConnectionBroker {
    config: Arc<RelayConfig>,
}

impl ConnectionBroker {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self { config }
    }

    /// Parse `destination` and pick the dialer for it.
    pub fn resolve(&self, destination: &str) -> Result<Dialer> {
        match DestinationSpec::parse(destination)? {
            DestinationSpec::Direct { address } => Ok(Dialer::Direct(DirectDialer::new(address))),
            DestinationSpec::Tunnel {
                ssh_host,
                ssh_user,
                destination: target,
            } => {
                let user = ssh_user
                    .or_else(|| self.config.identity.user.clone())
                    .ok_or_else(|| Error::UnknownUser(ssh_host.to_string()))?;
                Ok(Dialer::Tunnel(TunnelDialer::new(ssh_host, user, target)))
            }
        }
    }

    /// Resolve and dial. Each call is independent; nothing is reused between calls.
    pub async fn connect(&self, destination: &str) -> Result<Connection> {
        let dialer = self.resolve(destination)?;
        Ok(dialer.dial(&self.config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Identity;
    use crate::destination::Address;

    fn broker(identity: Identity) -> ConnectionBroker {
        ConnectionBroker::new(Arc::new(RelayConfig::new(identity)))
    }

    #[test]
    fn explicit_user_wins_over_identity() {
        let dialer = broker(Identity::new("alice", "/home/alice"))
            .resolve("ssh://deploy@jump:2222->db:5432")
            .unwrap();

        assert_eq!(
            dialer,
            Dialer::Tunnel(TunnelDialer::new(
                Address::new("jump", 2222),
                "deploy",
                Address::new("db", 5432)
            ))
        );
    }

    #[test]
    fn missing_user_is_taken_from_identity() {
        let dialer = broker(Identity::new("alice", "/home/alice"))
            .resolve("ssh://jump->internal:80")
            .unwrap();

        let Dialer::Tunnel(tunnel) = dialer else {
            panic!("expected tunnel dialer");
        };
        assert_eq!(tunnel.user(), "alice");
        assert_eq!(tunnel.ssh_host(), &Address::new("jump", 22));
        assert_eq!(tunnel.destination(), &Address::new("internal", 80));
    }

    #[test]
    fn missing_user_without_identity_is_an_error() {
        let err = broker(Identity::default())
            .resolve("ssh://jump->internal:80")
            .unwrap_err();

        assert!(
            matches!(err, Error::UnknownUser(_)),
            "expected UnknownUser error, got: {:?}",
            err
        );
    }

    #[test]
    fn direct_needs_no_identity() {
        let dialer = broker(Identity::default()).resolve("db:5432").unwrap();
        assert_eq!(
            dialer,
            Dialer::Direct(DirectDialer::new(Address::new("db", 5432)))
        );
    }

    #[test]
    fn malformed_destination_is_rejected() {
        let err = broker(Identity::default())
            .resolve("ssh://jumponly")
            .unwrap_err();
        assert!(matches!(err, Error::Destination(_)));
    }
}
