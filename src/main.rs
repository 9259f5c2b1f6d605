// ABOUTME: Entry point for the ferry CLI application.
// ABOUTME: Parses arguments, builds the relay configuration and runs the listener.

mod cli;

use clap::Parser;
use cli::Cli;
use ferry::broker::ConnectionBroker;
use ferry::config::RelayConfig;
use ferry::error::Result;
use ferry::listener::Listener;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = RelayConfig::from_env()
        .insecure_accept_any_host_key(cli.insecure_accept_any_host_key)
        .connect_timeout(Duration::from_secs(cli.connect_timeout));
    if let Some(user) = cli.user {
        config = config.user(user);
    }
    if let Some(dir) = cli.key_dir {
        config = config.key_dir(dir);
    }
    if let Some(path) = cli.known_hosts {
        config = config.known_hosts(path);
    }

    let broker = ConnectionBroker::new(Arc::new(config));
    // Reject a malformed destination or a missing SSH user before listening.
    broker.resolve(&cli.connect)?;

    let listener = Listener::bind(&cli.listen, cli.connect, broker).await?;

    tokio::select! {
        result = listener.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
