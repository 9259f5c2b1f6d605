// ABOUTME: One direction of a byte relay between two connections.
// ABOUTME: Copies in fixed-size chunks until the source ends or the session is shut down.

use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

/// Size of each read from the source connection.
pub const BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Accepted client towards the backend.
    AcceptedToBackend,
    /// Backend towards the accepted client.
    BackendToAccepted,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AcceptedToBackend => write!(f, "accepted->backend"),
            Direction::BackendToAccepted => write!(f, "backend->accepted"),
        }
    }
}

/// Why a direction stopped reading.
#[derive(Debug)]
pub enum DirectionEnd {
    /// The source closed its side in an orderly way.
    Eof,
    /// Reading from the source failed.
    ReadFailed(io::Error),
}

impl DirectionEnd {
    pub fn is_eof(&self) -> bool {
        matches!(self, DirectionEnd::Eof)
    }
}

impl fmt::Display for DirectionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionEnd::Eof => write!(f, "EOF"),
            DirectionEnd::ReadFailed(e) => write!(f, "read failed: {}", e),
        }
    }
}

/// The first direction of a session to finish, and how.
#[derive(Debug)]
pub struct RelayOutcome {
    pub direction: Direction,
    pub end: DirectionEnd,
    /// Bytes successfully written to the destination before the end.
    pub bytes: u64,
}

impl fmt::Display for RelayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ended with {} after {} bytes",
            self.direction, self.end, self.bytes
        )
    }
}

/// Resolves once the session asks its directions to stop.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        // A dropped sender also means the session is gone.
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Copy bytes from `reader` to `writer` until the reader ends.
///
/// Write failures are logged and reading continues. Returns the outcome when
/// the reader hits EOF or fails, or `None` when `shutdown` fired first.
pub async fn relay_direction<R, W>(
    direction: Direction,
    path: &str,
    mut reader: R,
    mut writer: W,
    mut shutdown: watch::Receiver<bool>,
) -> Option<RelayOutcome>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut bytes = 0u64;

    loop {
        let read = tokio::select! {
            r = reader.read(&mut buf) => r,
            _ = stopped(&mut shutdown) => {
                let _ = writer.shutdown().await;
                tracing::trace!("{}: stopped by session", path);
                return None;
            }
        };

        let n = match read {
            Ok(0) => {
                tracing::debug!("{}: EOF after {} bytes", path, bytes);
                // Pass the half-close on to the destination.
                tokio::select! {
                    _ = writer.shutdown() => {}
                    _ = stopped(&mut shutdown) => {
                        tracing::trace!("{}: stopped by session during half-close", path);
                    }
                }
                return Some(RelayOutcome {
                    direction,
                    end: DirectionEnd::Eof,
                    bytes,
                });
            }
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("{}: error from read: {}", path, e);
                return Some(RelayOutcome {
                    direction,
                    end: DirectionEnd::ReadFailed(e),
                    bytes,
                });
            }
        };
        tracing::trace!("{}: read {} bytes", path, n);

        tokio::select! {
            r = writer.write_all(&buf[..n]) => match r {
                Ok(()) => bytes += n as u64,
                Err(e) => tracing::warn!("{}: error writing: {}", path, e),
            },
            _ = stopped(&mut shutdown) => {
                tracing::trace!("{}: stopped by session mid-write", path);
                return None;
            }
        }

        buf.fill(0);
    }
}
