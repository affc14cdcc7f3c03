//! Hub actor implementation
//!
//! The central actor owning the connection registry and driving the
//! broadcast engine. Uses the Actor pattern with mpsc channels: all
//! registry mutation and broadcast computation happens on this task,
//! so no locks are needed and a slow peer can never block the hub —
//! deliveries go through per-connection queues, never transport I/O.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast;
use crate::envelope::Envelope;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Commands sent from connection handlers to the hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// New client transport accepted; reply carries the assigned identifier
    Connect {
        outbound: mpsc::Sender<String>,
        reply: oneshot::Sender<ConnectionId>,
    },
    /// Connection reached its terminal state
    Disconnect {
        id: ConnectionId,
    },
    /// Fan a decoded envelope out to the current connection set
    Broadcast {
        envelope: Envelope,
    },
    /// Close every connection and stop the actor; reply carries the
    /// number of connections closed
    Shutdown {
        reply: oneshot::Sender<usize>,
    },
}

/// The hub actor
///
/// Owns the registry and processes commands from connection handlers
/// until shutdown or until all command senders are dropped.
pub struct Hub {
    registry: Registry,
    receiver: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create a new hub with the given command receiver
    pub fn new(receiver: mpsc::Receiver<HubCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the hub event loop
    ///
    /// Processes commands until a `Shutdown` arrives or every command
    /// sender is dropped. Commands still queued behind a `Shutdown` are
    /// discarded, so nothing is broadcast after shutdown begins.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.receiver.recv().await {
            if !self.handle_command(cmd) {
                break;
            }
        }

        info!("Hub stopped");
    }

    /// Process a single command; returns false when the actor should stop
    fn handle_command(&mut self, cmd: HubCommand) -> bool {
        match cmd {
            HubCommand::Connect { outbound, reply } => {
                self.handle_connect(outbound, reply);
            }
            HubCommand::Disconnect { id } => {
                self.handle_disconnect(id);
            }
            HubCommand::Broadcast { envelope } => {
                self.handle_broadcast(envelope);
            }
            HubCommand::Shutdown { reply } => {
                let closed = self.registry.close_all();
                info!("Hub shutting down, closed {} connections", closed);
                let _ = reply.send(closed);
                return false;
            }
        }
        true
    }

    /// Register a new connection and hand its identifier back
    fn handle_connect(&mut self, outbound: mpsc::Sender<String>, reply: oneshot::Sender<ConnectionId>) {
        let id = self.registry.add(outbound);
        info!("Connection {} registered", id);

        // Handler gone before learning its id: roll the registration back
        if reply.send(id).is_err() {
            self.registry.remove(id);
        }

        debug!("Total connections: {}", self.registry.len());
    }

    /// Deregister a connection; unknown identifiers are a benign no-op
    fn handle_disconnect(&mut self, id: ConnectionId) {
        if self.registry.remove(id).is_some() {
            info!("Connection {} deregistered", id);
        }
        debug!("Total connections: {}", self.registry.len());
    }

    /// Distribute one envelope to a snapshot of the current connections
    fn handle_broadcast(&mut self, envelope: Envelope) {
        let snapshot = self.registry.snapshot();
        broadcast::distribute(&envelope, &snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::OUTBOUND_QUEUE_CAPACITY;
    use crate::envelope;
    use tokio::task::JoinSet;

    async fn connect(cmd_tx: &mpsc::Sender<HubCommand>) -> (ConnectionId, mpsc::Receiver<String>) {
        let (outbound, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (reply, reply_rx) = oneshot::channel();
        cmd_tx
            .send(HubCommand::Connect { outbound, reply })
            .await
            .unwrap();
        (reply_rx.await.unwrap(), rx)
    }

    fn spawn_hub() -> (mpsc::Sender<HubCommand>, tokio::task::JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let handle = tokio::spawn(Hub::new(cmd_rx).run());
        (cmd_tx, handle)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_sender_and_peer() {
        let (cmd_tx, _hub) = spawn_hub();
        let (id_a, mut rx_a) = connect(&cmd_tx).await;
        let (_id_b, mut rx_b) = connect(&cmd_tx).await;

        let envelope = envelope::decode(r#"{"id": "1", "text": "hello"}"#, id_a).unwrap();
        cmd_tx.send(HubCommand::Broadcast { envelope }).await.unwrap();

        // Both clients get the frame; A's copy is its own echo, which
        // the browser de-duplicates by message id
        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_disconnected_client_is_not_delivered() {
        let (cmd_tx, _hub) = spawn_hub();
        let (id_a, mut rx_a) = connect(&cmd_tx).await;
        let (id_b, mut rx_b) = connect(&cmd_tx).await;

        cmd_tx.send(HubCommand::Disconnect { id: id_b }).await.unwrap();

        let envelope = envelope::decode("still chatting", id_a).unwrap();
        cmd_tx.send(HubCommand::Broadcast { envelope }).await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), "still chatting");
        // B's outbound sender was dropped on removal
        assert!(rx_b.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_connect_disconnect_keeps_registry_consistent() {
        let (cmd_tx, _hub) = spawn_hub();

        // 100 simulated connections racing through the command channel;
        // every other one disconnects again
        let mut tasks = JoinSet::new();
        for n in 0..100u32 {
            let cmd_tx = cmd_tx.clone();
            tasks.spawn(async move {
                let (id, rx) = connect(&cmd_tx).await;
                if n % 2 == 0 {
                    cmd_tx.send(HubCommand::Disconnect { id }).await.unwrap();
                    None
                } else {
                    Some((id, rx))
                }
            });
        }

        let mut survivors = Vec::new();
        let mut ids = std::collections::HashSet::new();
        while let Some(result) = tasks.join_next().await {
            if let Some((id, rx)) = result.unwrap() {
                assert!(ids.insert(id));
                survivors.push(rx);
            }
        }
        assert_eq!(survivors.len(), 50);

        let origin = *ids.iter().next().unwrap();
        let envelope = envelope::decode(r#"{"id": "7", "text": "headcount"}"#, origin).unwrap();
        cmd_tx.send(HubCommand::Broadcast { envelope }).await.unwrap();

        // Exactly the surviving connections are delivered
        for rx in survivors.iter_mut() {
            assert_eq!(rx.recv().await.unwrap(), "headcount");
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_all_connections_and_stops_actor() {
        let (cmd_tx, hub) = spawn_hub();
        let (_id_a, mut rx_a) = connect(&cmd_tx).await;
        let (_id_b, mut rx_b) = connect(&cmd_tx).await;

        let (reply, reply_rx) = oneshot::channel();
        cmd_tx.send(HubCommand::Shutdown { reply }).await.unwrap();
        assert_eq!(reply_rx.await.unwrap(), 2);
        hub.await.unwrap();

        // Outbound queues are released, ending the writer tasks
        assert!(rx_a.recv().await.is_none());
        assert!(rx_b.recv().await.is_none());

        // The actor is gone; further commands cannot be delivered
        let envelope = envelope::decode("too late", ConnectionId::new()).unwrap();
        let result = cmd_tx.send(HubCommand::Broadcast { envelope }).await;
        assert!(result.is_err());
    }
}
