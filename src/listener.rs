// ABOUTME: TCP accept loop that starts one relay session per inbound connection.
// ABOUTME: Bind and accept failures are fatal; per-connection dial failures are not.

use crate::broker::ConnectionBroker;
use crate::error::{Error, Result};
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and relays each one to the configured destination.
pub struct Listener {
    listener: TcpListener,
    destination: Arc<str>,
    broker: Arc<ConnectionBroker>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("destination", &self.destination)
            .finish()
    }
}

impl Listener {
    pub async fn bind(
        address: &str,
        destination: impl Into<String>,
        broker: ConnectionBroker,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| Error::Bind {
                address: address.to_string(),
                source,
            })?;

        let destination: String = destination.into();
        Ok(Self {
            listener,
            destination: Arc::from(destination),
            broker: Arc::new(broker),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept forever. Returns only when accepting fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            "Listening on {} and relaying to {}",
            self.local_addr()?,
            self.destination
        );

        loop {
            let (stream, peer) = self.listener.accept().await.map_err(Error::Accept)?;
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            tracing::info!("[{}] got a connection from {}", id, peer);

            tokio::spawn(serve_connection(
                id,
                stream,
                peer,
                Arc::clone(&self.destination),
                Arc::clone(&self.broker),
            ));
        }
    }
}

/// Dial the backend for one accepted connection and relay until it ends.
async fn serve_connection(
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    destination: Arc<str>,
    broker: Arc<ConnectionBroker>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("[{}] failed to set TCP_NODELAY: {}", id, e);
    }

    let backend = match broker.connect(&destination).await {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("[{}] failed to connect {} to {}: {}", id, peer, destination, e);
            return;
        }
    };
    tracing::debug!("[{}] backend {} is open", id, destination);

    let started = Instant::now();
    match Session::new(id, peer.to_string(), destination.to_string(), stream, backend)
        .run()
        .await
    {
        Some(outcome) => tracing::info!(
            "[{}] session {}->{} closed after {:?}: {}",
            id,
            peer,
            destination,
            started.elapsed(),
            outcome
        ),
        None => tracing::warn!(
            "[{}] session {}->{} closed without an outcome",
            id,
            peer,
            destination
        ),
    }
}
