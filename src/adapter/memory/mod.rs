//! In-memory reference transport
//!
//! [`MemoryBroker`] is a shared hub of named queues; [`MemoryAdapter`] speaks
//! the full adapter contract over it with whatever capability subset it is
//! built with. Used by the host when no real broker is wired in, and by
//! tests to exercise every reactor strategy.

mod adapter;
mod broker;

pub use adapter::MemoryAdapter;
pub use broker::{BrokerError, BrokerResult, Delivery, MemoryBroker, DEFAULT_MAX_QUEUE_SIZE};
