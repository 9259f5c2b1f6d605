// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Takes the listen address, the destination and SSH overrides.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Relay TCP connections directly or through an SSH jump host")]
#[command(version)]
pub struct Cli {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    pub listen: String,

    /// Where to relay to: tcp://host:port, ssh://[user@]jump[:port]->host:port, or host:port
    #[arg(short, long)]
    pub connect: String,

    /// SSH user when the destination does not name one (default: current user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Directory scanned for id_* private keys (default: ~/.ssh)
    #[arg(long)]
    pub key_dir: Option<PathBuf>,

    /// known_hosts file used to verify jump hosts (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Accept any SSH host key without verification (insecure)
    #[arg(long)]
    pub insecure_accept_any_host_key: bool,

    /// Seconds to wait when connecting to a backend or jump host
    #[arg(long, default_value_t = 30)]
    pub connect_timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
