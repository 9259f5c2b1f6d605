// ABOUTME: A relay session between an accepted connection and its backend.
// ABOUTME: Runs both directions concurrently; EOF half-closes, a read error tears both down.

use crate::relay::{Direction, RelayOutcome, relay_direction};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};

/// Owns both connections of one relayed client for the lifetime of the relay.
pub struct Session<A, B> {
    id: u64,
    accepted_label: String,
    backend_label: String,
    accepted: A,
    backend: B,
}

impl<A, B> std::fmt::Debug for Session<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("accepted", &self.accepted_label)
            .field("backend", &self.backend_label)
            .finish()
    }
}

impl<A, B> Session<A, B>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(
        id: u64,
        accepted_label: impl Into<String>,
        backend_label: impl Into<String>,
        accepted: A,
        backend: B,
    ) -> Self {
        Self {
            id,
            accepted_label: accepted_label.into(),
            backend_label: backend_label.into(),
            accepted,
            backend,
        }
    }

    /// Relay until both directions are done.
    ///
    /// An EOF is a half-close: it is passed on to the other side and the
    /// opposite direction keeps running until it ends too. A read error stops
    /// the other direction at once. Both connections are closed before this
    /// returns, and the first reported outcome is returned. `None` means
    /// neither direction reported, which only happens if both tasks died.
    pub async fn run(self) -> Option<RelayOutcome> {
        let (accepted_read, accepted_write) = tokio::io::split(self.accepted);
        let (backend_read, backend_write) = tokio::io::split(self.backend);

        let (done_tx, mut done_rx) = mpsc::channel::<RelayOutcome>(2);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inbound_path = format!(
            "[{}] {}->{}",
            self.id, self.accepted_label, self.backend_label
        );
        let outbound_path = format!(
            "[{}] {}->{}",
            self.id, self.backend_label, self.accepted_label
        );

        let inbound = {
            let done = done_tx.clone();
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Some(outcome) = relay_direction(
                    Direction::AcceptedToBackend,
                    &inbound_path,
                    accepted_read,
                    backend_write,
                    shutdown,
                )
                .await
                {
                    let _ = done.send(outcome).await;
                }
            })
        };

        let outbound = tokio::spawn(async move {
            if let Some(outcome) = relay_direction(
                Direction::BackendToAccepted,
                &outbound_path,
                backend_read,
                accepted_write,
                shutdown_rx,
            )
            .await
            {
                let _ = done_tx.send(outcome).await;
            }
        });

        let outcome = done_rx.recv().await;
        if let Some(first) = outcome.as_ref().filter(|o| o.end.is_eof()) {
            tracing::debug!(
                "[{}] {} half-closed, waiting for the other side",
                self.id,
                first.direction
            );
            if let Some(second) = done_rx.recv().await {
                tracing::debug!("[{}] {}", self.id, second);
            }
        }

        // Stop whatever is still running, then wait so both halves are dropped.
        let _ = shutdown_tx.send(true);
        for (name, task) in [("inbound", inbound), ("outbound", outbound)] {
            if let Err(e) = task.await {
                tracing::warn!("[{}] {} relay task failed: {}", self.id, name, e);
            }
        }

        outcome
    }
}
