//! Request/Reply Coordinator
//!
//! Implements duplex messaging on top of one-way queues. A request gets a
//! freshly declared ephemeral reply destination, a one-shot completion slot
//! keyed by that destination, and a timer. Whatever happens first (reply,
//! timeout, send failure, or the caller dropping the future) the slot and the
//! destination are released exactly once by [`PendingGuard`].
//!
//! The coordinator knows nothing about brokers. Adapters plug in through
//! [`EphemeralTransport`].

mod coordinator;

pub use coordinator::{EphemeralTransport, ReplyListener, RequestReplyCoordinator};

#[cfg(test)]
mod tests;
