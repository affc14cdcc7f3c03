//! Broadcast engine
//!
//! Fans a decoded envelope out to a point-in-time snapshot of the
//! registry. Every connection in the snapshot gets exactly one delivery
//! attempt, the origin included — echo suppression happens client-side
//! by message id, not by sender exclusion here. A target that fails
//! (queue full, or closed since the snapshot was taken) is logged and
//! skipped; distribution to the remaining targets always completes.

use tracing::{debug, warn};

use crate::connection::DeliveryError;
use crate::envelope::{self, Envelope};
use crate::registry::SnapshotEntry;

/// Deliver one envelope to every snapshot entry, in snapshot order
///
/// Returns the number of targets that accepted the frame.
pub fn distribute(envelope: &Envelope, snapshot: &[SnapshotEntry]) -> usize {
    let frame = envelope::encode(envelope);
    let mut delivered = 0;

    for entry in snapshot {
        match entry.try_deliver(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(DeliveryError::QueueFull) => {
                warn!(
                    "Dropping message {} for slow connection {}",
                    envelope.id, entry.id
                );
            }
            Err(DeliveryError::Closed) => {
                debug!(
                    "Connection {} closed before delivery of message {}",
                    entry.id, envelope.id
                );
            }
        }
    }

    debug!(
        "Distributed message {} to {}/{} connections, {:?} after receipt",
        envelope.id,
        delivered,
        snapshot.len(),
        envelope.received_at.elapsed()
    );
    delivered
}
