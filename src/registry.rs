//! Connection registry
//!
//! Tracks every live connection and its identity. The registry is owned
//! by the hub actor; all mutation goes through the hub's command
//! channel, which serializes `add`/`remove`/`snapshot` relative to each
//! other without locks.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::{Connection, DeliveryError};
use crate::types::ConnectionId;

/// One entry of a broadcast snapshot: an identifier and a clone of the
/// connection's outbound sender.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub id: ConnectionId,
    pub outbound: mpsc::Sender<String>,
}

impl SnapshotEntry {
    /// Attempt a non-blocking delivery of one outbound frame
    ///
    /// Never waits on the peer: a full queue or a torn-down receiver is
    /// reported as a [`DeliveryError`] and the frame is dropped for
    /// this target only.
    pub fn try_deliver(&self, frame: String) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Registry of live connections
///
/// HashMap for O(1) lookup plus a registration-order index so
/// snapshots iterate in the order connections were added.
#[derive(Debug, Default)]
pub struct Registry {
    /// All registered connections: ConnectionId -> Connection
    connections: HashMap<ConnectionId, Connection>,
    /// Identifiers in registration order
    order: Vec<ConnectionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and assign its identifier
    ///
    /// The identifier is minted here so the 1:1 mapping between
    /// identifiers and live transports has a single owner.
    pub fn add(&mut self, outbound: mpsc::Sender<String>) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections.insert(id, Connection::new(id, outbound));
        self.order.push(id);
        debug!("Registered connection {} (total {})", id, self.connections.len());
        id
    }

    /// Remove a connection, returning it in the terminal Closed state
    ///
    /// Removing an unknown identifier is a benign no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        match self.connections.remove(&id) {
            Some(mut conn) => {
                self.order.retain(|entry| *entry != id);
                conn.finish_close();
                debug!("Removed connection {} (total {})", id, self.connections.len());
                Some(conn)
            }
            None => {
                debug!("Remove of unknown connection {} ignored", id);
                None
            }
        }
    }

    /// Look up a connection by identifier
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Point-in-time copy of all open connections, in registration order
    ///
    /// The snapshot owns sender clones, so one broadcast computed from
    /// it is unaffected by registry mutations that happen afterwards.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        self.order
            .iter()
            .filter_map(|id| self.connections.get(id))
            .filter(|conn| conn.is_open())
            .map(|conn| SnapshotEntry {
                id: conn.id,
                outbound: conn.outbound(),
            })
            .collect()
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every registered connection and release the registry
    ///
    /// Marks each connection Closing and drops it; dropping the
    /// outbound sender ends the writer task, which flushes its queue
    /// and sends the close frame. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.connections.len();
        for (_, conn) in self.connections.iter_mut() {
            conn.begin_close();
        }
        self.connections.clear();
        self.order.clear();
        count
    }
}
