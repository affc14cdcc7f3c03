//! Single-Room WebSocket Chat Hub Library
//!
//! A real-time message-distribution server built with tokio-tungstenite
//! using the Actor pattern for state management. Every client connects
//! to one global room; every message a client sends is fanned out to
//! every open connection, the sender included (clients de-duplicate
//! their own echo by message id).
//!
//! # Features
//! - WebSocket connection handling with identity assignment
//! - JSON `{"id", "text"}` frames plus legacy bare text frames
//! - Ordered fan-out broadcast with at-most-once delivery per client
//! - Bounded per-connection outbound queues (slow clients drop frames
//!   instead of stalling the hub)
//! - Graceful shutdown with a bounded close grace period
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Hub` is the central actor owning the connection `Registry`
//! - Each connection has a handler task communicating with the hub
//! - No locks needed - all state access goes through message passing
//! - Each connection's writer task is the sole drain of its outbound
//!   queue, so wire frames never interleave
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chathub::{Hub, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Hub::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod broadcast;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod hub;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use connection::{Connection, ConnectionState, DeliveryError, OUTBOUND_QUEUE_CAPACITY};
pub use envelope::{DecodeError, Envelope};
pub use error::HubError;
pub use handler::handle_connection;
pub use hub::{Hub, HubCommand};
pub use registry::{Registry, SnapshotEntry};
pub use types::ConnectionId;
