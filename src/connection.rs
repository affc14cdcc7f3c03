//! Connection record and lifecycle state
//!
//! Represents one registered client: its identifier, lifecycle state,
//! and the sending half of its bounded outbound queue. Owned by the
//! registry; the connection handler holds the queue's receiving half.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::ConnectionId;

/// Capacity of each connection's outbound queue. When a client falls
/// this many frames behind, further frames to it are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 32;

/// Connection lifecycle
///
/// `Open → Closing → Closed`, with `Closed` terminal. Entered on close
/// frame, transport error, or hub shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames flow in both directions
    Open,
    /// No new deliveries; outstanding writes flush
    Closing,
    /// Transport gone, entry removed from the registry
    Closed,
}

/// One registered client connection
#[derive(Debug)]
pub struct Connection {
    /// Registry-assigned identifier, unique for the process lifetime
    pub id: ConnectionId,
    /// Current lifecycle state
    pub state: ConnectionState,
    /// Sending half of the outbound queue; the handler's writer task
    /// drains the other end
    outbound: mpsc::Sender<String>,
}

/// Per-target delivery failures
///
/// Swallowed by the broadcast engine after logging; a failed target
/// never aborts distribution to the rest of the snapshot.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Outbound queue is at capacity; the frame was dropped for this target
    #[error("outbound queue full")]
    QueueFull,

    /// The receiving half is gone (connection tore down mid-broadcast)
    #[error("connection closed")]
    Closed,
}

impl Connection {
    /// Create a new open connection with the given ID and outbound sender
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            state: ConnectionState::Open,
            outbound,
        }
    }

    /// Whether the connection is still open for deliveries
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Transition `Open → Closing`. No-op in any other state.
    pub fn begin_close(&mut self) {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
        }
    }

    /// Transition to the terminal `Closed` state
    pub fn finish_close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Clone the outbound sender, for snapshot entries
    pub fn outbound(&self) -> mpsc::Sender<String> {
        self.outbound.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_starts_open() {
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = Connection::new(ConnectionId::new(), tx);

        assert!(conn.is_open());
        assert_eq!(conn.state, ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_connection_state_transitions() {
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let mut conn = Connection::new(ConnectionId::new(), tx);

        conn.begin_close();
        assert_eq!(conn.state, ConnectionState::Closing);
        assert!(!conn.is_open());

        // Closing is not re-enterable from Closing
        conn.begin_close();
        assert_eq!(conn.state, ConnectionState::Closing);

        conn.finish_close();
        assert_eq!(conn.state, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_outbound_clone_feeds_same_queue() {
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let conn = Connection::new(ConnectionId::new(), tx);

        conn.outbound().send("hello".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }
}
