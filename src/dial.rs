// ABOUTME: Backend dialers: direct TCP or an SSH tunnel.
// ABOUTME: Both produce a boxed bidirectional byte stream for the relay.

use crate::config::RelayConfig;
use crate::destination::Address;
use crate::ssh::{self, TunnelDialer};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connecting to {address} timed out after {after:?}")]
    Timeout { address: String, after: Duration },

    #[error("connecting to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH tunnel failed: {0}")]
    Tunnel(#[from] ssh::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Any readable and writable byte stream a backend can be reached through.
pub trait BackendStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> BackendStream for T {}

/// An established backend connection.
pub type Connection = Box<dyn BackendStream>;

/// Dials a plain TCP address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectDialer {
    address: Address,
}

impl DirectDialer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub async fn dial(&self, timeout: Duration) -> Result<TcpStream> {
        let address = self.address.to_string();
        let connect = TcpStream::connect((self.address.host(), self.address.port()));

        let stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| Error::Timeout {
                address: address.clone(),
                after: timeout,
            })?
            .map_err(|source| Error::Connect { address, source })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY on backend {}: {}", self.address, e);
        }
        Ok(stream)
    }
}

/// A fully resolved way of reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialer {
    Direct(DirectDialer),
    Tunnel(TunnelDialer),
}

impl Dialer {
    /// Establish the backend connection. No retries.
    pub async fn dial(&self, config: &RelayConfig) -> Result<Connection> {
        match self {
            Dialer::Direct(direct) => {
                let stream = direct.dial(config.connect_timeout).await?;
                Ok(Box::new(stream))
            }
            Dialer::Tunnel(tunnel) => {
                let stream = tunnel.dial(config).await?;
                Ok(Box::new(stream))
            }
        }
    }
}
