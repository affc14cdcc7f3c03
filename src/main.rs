//! Chat Hub - Entry Point
//!
//! Starts the TCP listener and the hub actor, accepting connections
//! until a shutdown signal arrives.

use std::env;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use chathub::{handle_connection, Hub, HubCommand};

/// Default server address
const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channel buffer size for hub commands
const CHANNEL_BUFFER_SIZE: usize = 256;

/// How long to wait for connections to close cleanly on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chathub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chathub=info")),
        )
        .init();

    // Get bind address from command line or use default
    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    // Start TCP listener; failing to bind is the one process-fatal error
    let listener = TcpListener::bind(&addr).await?;
    info!("Chat hub listening on {}", addr);

    // Create hub actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(Hub::new(cmd_rx).run());

    info!("Hub actor started");

    let mut handlers = JoinSet::new();

    // Connection accept loop, until ctrl-c
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!("New connection from {}", peer);
                        let cmd_tx = cmd_tx.clone();

                        handlers.spawn(async move {
                            if let Err(e) = handle_connection(stream, cmd_tx).await {
                                error!("Connection handler error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
            // Reap finished handler tasks so the set does not grow
            Some(_) = handlers.join_next(), if !handlers.is_empty() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // Stop accepting, then close everything still registered; the hub
    // dropping the outbound senders lets each writer flush its queue
    // and send a clean close frame
    drop(listener);
    let (reply, reply_rx) = oneshot::channel();
    if cmd_tx.send(HubCommand::Shutdown { reply }).await.is_ok() {
        let _ = reply_rx.await;
    }

    // Bounded grace period for handlers to finish, then force-close
    let drain = async {
        while handlers.join_next().await.is_some() {}
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        debug!("Grace period elapsed, aborting remaining handlers");
        handlers.abort_all();
    }

    info!("Chat hub stopped");
    Ok(())
}
