//! Message envelope and wire codec
//!
//! Decodes inbound text frames into `Envelope`s and encodes envelopes
//! into the outbound wire form. Two inbound shapes are accepted: the
//! current JSON protocol `{"id": "...", "text": "..."}` and legacy bare
//! text frames, which get a server-assigned id. Outbound frames carry
//! the text content only.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use thiserror::Error;

use crate::types::ConnectionId;

/// A single chat message in flight
///
/// Built by [`decode`] when a frame arrives, consumed by the broadcast
/// engine. Immutable after construction. The origin connection may no
/// longer exist by the time delivery is attempted.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Message id: client-generated (current protocol) or
    /// server-assigned (legacy bare frames). Clients de-duplicate their
    /// own echo on this id.
    pub id: String,
    /// Message text, non-empty after trim
    pub text: String,
    /// Identifier of the sending connection
    pub origin: ConnectionId,
    /// When the frame was decoded
    pub received_at: Instant,
}

/// Wire form of a current-protocol client frame
#[derive(Debug, Deserialize)]
struct WireFrame {
    id: String,
    text: String,
}

/// Frame-level decode failures
///
/// Never fatal to the connection: the offending frame is dropped and
/// the read loop continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame was structurally JSON but failed to parse as a chat frame
    #[error("malformed JSON frame: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Message text was empty or whitespace-only after trim
    #[error("empty message text")]
    EmptyText,
}

/// Decode a raw inbound text frame into an envelope
///
/// A frame whose first non-whitespace byte is `{` is treated as the
/// JSON protocol; anything else is a legacy bare text frame and gets a
/// server-assigned millisecond id.
pub fn decode(raw: &str, origin: ConnectionId) -> Result<Envelope, DecodeError> {
    let (id, text) = if raw.trim_start().starts_with('{') {
        let frame: WireFrame = serde_json::from_str(raw)?;
        (frame.id, frame.text)
    } else {
        (server_assigned_id(), raw.to_string())
    };

    if text.trim().is_empty() {
        return Err(DecodeError::EmptyText);
    }

    Ok(Envelope {
        id,
        text,
        origin,
        received_at: Instant::now(),
    })
}

/// Encode an envelope into its outbound wire form
///
/// Peers receive the text content as a bare text frame, matching the
/// browser client's expectation of reading `e.data` as plain text.
pub fn encode(envelope: &Envelope) -> String {
    envelope.text.clone()
}

/// Millisecond-timestamp id for legacy frames, mirroring the id format
/// current clients generate themselves.
fn server_assigned_id() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_frame() {
        let origin = ConnectionId::new();
        let envelope = decode(r#"{"id": "1731000000000", "text": "hello"}"#, origin).unwrap();
        assert_eq!(envelope.id, "1731000000000");
        assert_eq!(envelope.text, "hello");
        assert_eq!(envelope.origin, origin);
    }

    #[test]
    fn test_decode_bare_frame_gets_server_id() {
        let envelope = decode("hello from a legacy client", ConnectionId::new()).unwrap();
        assert_eq!(envelope.text, "hello from a legacy client");
        assert!(!envelope.id.is_empty());
        assert!(envelope.id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let result = decode(r#"{"id": "1", "text": "#, ConnectionId::new());
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_json_missing_fields() {
        let result = decode(r#"{"id": "1"}"#, ConnectionId::new());
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_empty_text() {
        assert!(matches!(
            decode("", ConnectionId::new()),
            Err(DecodeError::EmptyText)
        ));
        assert!(matches!(
            decode("   \t ", ConnectionId::new()),
            Err(DecodeError::EmptyText)
        ));
    }

    #[test]
    fn test_decode_rejects_whitespace_json_text() {
        let result = decode(r#"{"id": "2", "text": "   "}"#, ConnectionId::new());
        assert!(matches!(result, Err(DecodeError::EmptyText)));
    }

    #[test]
    fn test_decode_is_left_inverse_of_encode() {
        let origin = ConnectionId::new();
        let envelope = decode(r#"{"id": "3", "text": "round trip"}"#, origin).unwrap();
        let reparsed = decode(&encode(&envelope), origin).unwrap();
        assert_eq!(reparsed.text, envelope.text);
    }
}
