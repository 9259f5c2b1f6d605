// ABOUTME: SSH tunnel dialing using russh.
// ABOUTME: Authenticates to a jump host with discovered keys and opens a direct-tcpip channel.

use super::error::{Error, Result};
use super::host_key::HostKeyPolicy;
use super::keys::{KeyMaterial, KeyStore};
use crate::config::RelayConfig;
use crate::destination::Address;
use russh::client::{self, Config, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, ssh_key};
use russh::{ChannelStream, Disconnect};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Originator reported in direct-tcpip requests; the relay does not expose
/// the accepted peer to the jump host.
const ORIGINATOR_ADDRESS: &str = "0.0.0.0";
const ORIGINATOR_PORT: u32 = 0;

/// russh client handler that delegates server key checks to a [`HostKeyPolicy`].
pub(crate) struct TunnelHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for TunnelHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.policy.verify(&self.host, self.port, server_public_key))
    }
}

/// Dials a destination through an SSH jump host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelDialer {
    ssh_host: Address,
    user: String,
    destination: Address,
}

impl TunnelDialer {
    pub fn new(ssh_host: Address, user: impl Into<String>, destination: Address) -> Self {
        Self {
            ssh_host,
            user: user.into(),
            destination,
        }
    }

    pub fn ssh_host(&self) -> &Address {
        &self.ssh_host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    /// Discover keys, build the host key policy, authenticate, then forward.
    pub async fn dial(&self, config: &RelayConfig) -> Result<TunnelStream> {
        let key_dir = config.key_dir_path().ok_or(Error::NoKeyDirectory)?;
        let keys = KeyStore::new(key_dir).discover()?;
        let policy = HostKeyPolicy::from_config(config)?;

        self.dial_with(config, keys, policy).await
    }

    /// Dial with already prepared keys and policy.
    pub async fn dial_with(
        &self,
        config: &RelayConfig,
        keys: KeyMaterial,
        policy: HostKeyPolicy,
    ) -> Result<TunnelStream> {
        tracing::info!(
            "Connecting to {}@{} to reach {}",
            self.user,
            self.ssh_host,
            self.destination
        );

        let session = tokio::time::timeout(config.connect_timeout, self.establish(&keys, policy))
            .await
            .map_err(|_| Error::Timeout {
                host: self.ssh_host.to_string(),
                after: config.connect_timeout,
            })??;

        let channel = match session
            .channel_open_direct_tcpip(
                self.destination.host(),
                u32::from(self.destination.port()),
                ORIGINATOR_ADDRESS,
                ORIGINATOR_PORT,
            )
            .await
        {
            Ok(channel) => channel,
            Err(source) => {
                let _ = session
                    .disconnect(Disconnect::ByApplication, "", "en")
                    .await;
                return Err(Error::Forward {
                    host: self.ssh_host.to_string(),
                    destination: self.destination.to_string(),
                    source,
                });
            }
        };

        tracing::debug!(
            "Forwarded channel to {} open through {}",
            self.destination,
            self.ssh_host
        );

        Ok(TunnelStream {
            stream: Box::pin(channel.into_stream()),
            _session: session,
        })
    }

    /// Open the transport and authenticate.
    async fn establish(
        &self,
        keys: &KeyMaterial,
        policy: HostKeyPolicy,
    ) -> Result<Handle<TunnelHandler>> {
        let russh_config = Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        let handler = TunnelHandler {
            host: self.ssh_host.host().to_string(),
            port: self.ssh_host.port(),
            policy,
        };

        let mut session = client::connect(
            Arc::new(russh_config),
            (self.ssh_host.host(), self.ssh_host.port()),
            handler,
        )
        .await
        .map_err(|e| match e {
            russh::Error::UnknownKey => Error::HostKeyRejected {
                host: self.ssh_host.to_string(),
            },
            other => Error::Transport {
                host: self.ssh_host.to_string(),
                reason: other.to_string(),
            },
        })?;

        self.authenticate(&mut session, keys).await?;
        Ok(session)
    }

    /// Offer every signer in order until the server accepts one.
    async fn authenticate(
        &self,
        session: &mut Handle<TunnelHandler>,
        keys: &KeyMaterial,
    ) -> Result<()> {
        let hash_alg = session.best_supported_rsa_hash().await?.flatten();

        for signer in keys.signers() {
            let result = session
                .authenticate_publickey(
                    &self.user,
                    PrivateKeyWithHashAlg::new(Arc::clone(&signer.key), hash_alg),
                )
                .await?;

            if result.success() {
                tracing::debug!(
                    "Authenticated as {}@{} with {}",
                    self.user,
                    self.ssh_host,
                    signer.path.display()
                );
                return Ok(());
            }
            tracing::debug!("Key {} rejected by {}", signer.path.display(), self.ssh_host);
        }

        Err(Error::AuthenticationFailed {
            user: self.user.clone(),
            host: self.ssh_host.to_string(),
            offered: keys.len(),
        })
    }
}

/// A forwarded channel plus the SSH session carrying it.
///
/// Dropping the stream drops the session handle, which ends the transport.
pub struct TunnelStream {
    stream: Pin<Box<ChannelStream<Msg>>>,
    _session: Handle<TunnelHandler>,
}

impl std::fmt::Debug for TunnelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TunnelStream")
            .field("stream", &"<russh::ChannelStream>")
            .field("session", &"<russh::Handle>")
            .finish()
    }
}

impl AsyncRead for TunnelStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut().stream.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for TunnelStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().stream.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().stream.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().stream.as_mut().poll_shutdown(cx)
    }
}
