// ABOUTME: Destination specification parsing.
// ABOUTME: Parses "tcp://host:port", "ssh://[user@]jump[:port]->host:port" and bare addresses.

use std::fmt;
use thiserror::Error;

const TCP_SCHEME: &str = "tcp://";
const SSH_SCHEME: &str = "ssh://";
const TUNNEL_ARROW: &str = "->";
const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("destination cannot be empty")]
    Empty,

    #[error("unsupported scheme in destination: {0}")]
    UnsupportedScheme(String),

    #[error("ssh destination must contain exactly one '->' separating the jump host from the target: {0}")]
    MissingArrow(String),

    #[error("ssh destination contains more than one '->': {0}")]
    TooManyArrows(String),

    #[error("address is missing a port: {0}")]
    MissingPort(String),

    #[error("invalid port in address {address}: {port}")]
    InvalidPort { address: String, port: String },

    #[error("hostname cannot be empty in address: {0}")]
    EmptyHost(String),

    #[error("username cannot be empty in ssh target: {0}")]
    EmptyUser(String),
}

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port` or `[v6]:port`. The port is mandatory.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        Self::parse_with_default_port(s, None)
    }

    fn parse_with_default_port(s: &str, default_port: Option<u16>) -> Result<Self, ParseError> {
        let (host, port) = match split_host_port(s) {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .map_err(|_| ParseError::InvalidPort {
                        address: s.to_string(),
                        port: port_str.to_string(),
                    })?;
                (host, port)
            }
            None => match default_port {
                Some(port) => (strip_brackets(s), port),
                None => return Err(ParseError::MissingPort(s.to_string())),
            },
        };

        if host.is_empty() {
            return Err(ParseError::EmptyHost(s.to_string()));
        }

        Ok(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Split off the port. Bracketed hosts may contain colons; unbracketed hosts
/// with more than one colon are treated as having no port.
fn split_host_port(s: &str) -> Option<(&str, &str)> {
    if let Some(rest) = s.strip_prefix('[') {
        let close = rest.find(']')?;
        let port = rest[close + 1..].strip_prefix(':')?;
        return Some((&rest[..close], port));
    }

    let colon = s.rfind(':')?;
    if s[..colon].contains(':') {
        return None;
    }
    Some((&s[..colon], &s[colon + 1..]))
}

fn strip_brackets(s: &str) -> &str {
    s.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s)
}

/// Where an accepted connection should be relayed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationSpec {
    /// Plain TCP dial.
    Direct { address: Address },
    /// `direct-tcpip` channel opened through an SSH server.
    Tunnel {
        ssh_host: Address,
        ssh_user: Option<String>,
        destination: Address,
    },
}

impl DestinationSpec {
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(rest) = s.strip_prefix(SSH_SCHEME) {
            return Self::parse_tunnel(rest);
        }

        let address = match s.strip_prefix(TCP_SCHEME) {
            Some(rest) => rest,
            None => {
                if let Some(scheme_end) = s.find("://") {
                    return Err(ParseError::UnsupportedScheme(s[..scheme_end].to_string()));
                }
                s
            }
        };

        Ok(DestinationSpec::Direct {
            address: Address::parse(address)?,
        })
    }

    fn parse_tunnel(spec: &str) -> Result<Self, ParseError> {
        let mut parts = spec.split(TUNNEL_ARROW);
        let (target, destination) = match (parts.next(), parts.next(), parts.next()) {
            (Some(target), Some(destination), None) => (target, destination),
            (_, None, _) => return Err(ParseError::MissingArrow(spec.to_string())),
            _ => return Err(ParseError::TooManyArrows(spec.to_string())),
        };

        let (ssh_user, ssh_host) = match target.split_once('@') {
            Some(("", _)) => return Err(ParseError::EmptyUser(target.to_string())),
            Some((user, host)) => (Some(user.to_string()), host),
            None => (None, target),
        };

        Ok(DestinationSpec::Tunnel {
            ssh_host: Address::parse_with_default_port(ssh_host, Some(DEFAULT_SSH_PORT))?,
            ssh_user,
            destination: Address::parse(destination)?,
        })
    }

    /// The address the relayed bytes finally reach.
    pub fn target(&self) -> &Address {
        match self {
            DestinationSpec::Direct { address } => address,
            DestinationSpec::Tunnel { destination, .. } => destination,
        }
    }
}

impl fmt::Display for DestinationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationSpec::Direct { address } => write!(f, "{TCP_SCHEME}{address}"),
            DestinationSpec::Tunnel {
                ssh_host,
                ssh_user: Some(user),
                destination,
            } => write!(f, "{SSH_SCHEME}{user}@{ssh_host}{TUNNEL_ARROW}{destination}"),
            DestinationSpec::Tunnel {
                ssh_host,
                ssh_user: None,
                destination,
            } => write!(f, "{SSH_SCHEME}{ssh_host}{TUNNEL_ARROW}{destination}"),
        }
    }
}
