// ABOUTME: In-process SSH jump host for tunnel integration tests.
// ABOUTME: Authorizes a single client key and serves direct-tcpip by dialing the target.

use russh::Channel;
use russh::keys::{PublicKey, load_secret_key};
use russh::server::{self, Auth, Msg, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// A running jump host on a loopback port.
pub struct JumpHost {
    pub port: u16,
    pub host_key: PublicKey,
}

impl JumpHost {
    /// A known_hosts line that trusts this jump host.
    pub fn known_hosts_line(&self) -> String {
        let key = self
            .host_key
            .to_openssh()
            .expect("host key should encode");
        format!("[127.0.0.1]:{} {}", self.port, key)
    }
}

/// Start a jump host using the `host_key` fixture.
///
/// Only `authorized_key` may log in. With `allow_forwarding` unset every
/// direct-tcpip request is refused.
pub async fn spawn_jump_host(authorized_key: PublicKey, allow_forwarding: bool) -> JumpHost {
    let host_key =
        load_secret_key(super::fixture("host_key"), None).expect("host key fixture should load");
    let public = host_key.public_key().clone();

    let config = Arc::new(server::Config {
        keys: vec![host_key],
        auth_rejection_time: Duration::from_millis(10),
        auth_rejection_time_initial: Some(Duration::ZERO),
        ..Default::default()
    });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("jump host should bind");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let handler = JumpHostHandler {
                authorized_key: authorized_key.clone(),
                allow_forwarding,
            };
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                match server::run_stream(config, stream, handler).await {
                    Ok(session) => {
                        if let Err(e) = session.await {
                            tracing::debug!("jump host session ended: {}", e);
                        }
                    }
                    Err(e) => tracing::debug!("jump host handshake failed: {}", e),
                }
            });
        }
    });

    JumpHost {
        port,
        host_key: public,
    }
}

struct JumpHostHandler {
    authorized_key: PublicKey,
    allow_forwarding: bool,
}

impl server::Handler for JumpHostHandler {
    type Error = russh::Error;

    async fn auth_publickey(
        &mut self,
        _user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        if public_key.key_data() == self.authorized_key.key_data() {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if !self.allow_forwarding {
            return Ok(false);
        }

        let target = format!("{}:{}", host_to_connect, port_to_connect);
        tokio::spawn(async move {
            let Ok(mut backend) = TcpStream::connect(&target).await else {
                return;
            };
            let mut stream = Box::pin(channel.into_stream());
            let _ = tokio::io::copy_bidirectional(&mut stream, &mut backend).await;
        });
        Ok(true)
    }
}
