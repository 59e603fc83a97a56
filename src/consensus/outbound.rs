use crate::consensus::{MemberId, RaftMessage};

/// Fire-and-forget delivery of raft messages to other members.
///
/// Delivery is at-least-once at best, with no ordering across independent sends. Failures are not
/// reported to the caller; the shipper detects them only through its retry timeout.
pub trait Outbound: Send + Sync {
    fn send(&self, to: &MemberId, message: RaftMessage);
}
