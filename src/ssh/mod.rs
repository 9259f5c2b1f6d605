// ABOUTME: SSH tunneling for backend connections.
// ABOUTME: Key discovery, host key policy and direct-tcpip forwarding over russh.

mod error;
mod host_key;
mod keys;
mod tunnel;

pub use error::{Error, Result};
pub use host_key::HostKeyPolicy;
pub use keys::{KeyMaterial, KeyStore, Signer};
pub use tunnel::{TunnelDialer, TunnelStream};
