//! Error types for the chat hub
//!
//! Connection-fatal and process-fatal errors live here. Frame-level
//! decode failures (`DecodeError`) and per-target delivery failures
//! (`DeliveryError`) are defined beside the codec and connection they
//! describe; neither of those ends a connection.

use thiserror::Error;

/// Connection and process level errors
///
/// Everything here terminates the connection it occurs on. The only
/// process-fatal condition is failing to bind the listen socket, which
/// surfaces as `Io` from `main` before any connection exists.
#[derive(Debug, Error)]
pub enum HubError {
    /// WebSocket protocol error (fatal to the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hub command channel closed (hub actor gone)
    #[error("hub channel closed")]
    ChannelSend,
}
