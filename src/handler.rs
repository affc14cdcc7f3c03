//! WebSocket connection handler
//!
//! Handles one client connection: WebSocket handshake, registration
//! with the hub, a read loop decoding inbound frames, and a single
//! writer task draining the connection's outbound queue.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionState, OUTBOUND_QUEUE_CAPACITY};
use crate::envelope;
use crate::error::HubError;
use crate::hub::HubCommand;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers with the hub (which
/// assigns the connection identifier), then runs the read loop and the
/// writer task until either side ends. The connection walks
/// `Open → Closing → Closed`; on Closed it deregisters from the hub.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<HubCommand>,
) -> Result<(), HubError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Bounded outbound queue; the writer task below is its only drain
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_CAPACITY);

    // Register with the hub; the registry assigns the identifier
    let (reply, reply_rx) = oneshot::channel();
    if cmd_tx
        .send(HubCommand::Connect {
            outbound: outbound_tx,
            reply,
        })
        .await
        .is_err()
    {
        error!("Failed to register connection from {} - hub closed", peer_addr);
        return Err(HubError::ChannelSend);
    }
    let connection_id = reply_rx.await.map_err(|_| HubError::ChannelSend)?;

    info!("Connection {} open for {}", connection_id, peer_addr);

    // Clone cmd_tx for the read task
    let cmd_tx_read = cmd_tx.clone();

    // Read task: raw frames -> envelopes -> hub broadcast
    let read_task = tokio::spawn(async move {
        let mut state = ConnectionState::Open;

        while state == ConnectionState::Open {
            // Transport ending without a close frame also closes us
            let Some(msg_result) = ws_receiver.next().await else {
                break;
            };
            match msg_result {
                Ok(Message::Text(text)) => {
                    match envelope::decode(&text, connection_id) {
                        Ok(env) => {
                            if cmd_tx_read
                                .send(HubCommand::Broadcast { envelope: env })
                                .await
                                .is_err()
                            {
                                debug!("Hub closed, ending read loop for {}", connection_id);
                                state = ConnectionState::Closing;
                            }
                        }
                        Err(e) => {
                            // Frame-level failure: drop this frame only,
                            // the connection stays Open
                            warn!("Dropping frame from {}: {}", connection_id, e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    state = ConnectionState::Closing;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", connection_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection_id);
                }
                Ok(_) => {
                    // Binary or other frame types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    state = ConnectionState::Closing;
                }
            }
        }
        debug!("Read loop ended for {}", connection_id);
    });

    // Writer task: sole consumer of the outbound queue, so frames are
    // never interleaved on the wire
    let write_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                debug!("WebSocket send failed, ending writer for {}", connection_id);
                break;
            }
        }

        // Queue released or transport failed: attempt the clean close
        // handshake before the transport drops
        let _ = ws_sender.close().await;
        debug!("Writer ended for {}", connection_id);
    });

    // Either task finishing moves the connection into Closing
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // Closed: deregister. The hub dropping the registered sender also
    // ends the writer task if it is still draining.
    let _ = cmd_tx.send(HubCommand::Disconnect { id: connection_id }).await;

    info!("Connection {} closed", connection_id);

    Ok(())
}
