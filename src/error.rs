// ABOUTME: Application-wide error types for ferry.
// ABOUTME: Uses thiserror for ergonomic error handling.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("invalid destination: {0}")]
    Destination(#[from] crate::destination::ParseError),

    #[error("no SSH user given for {0} and the current user could not be resolved")]
    UnknownUser(String),

    #[error("dial failed: {0}")]
    Dial(#[from] crate::dial::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
