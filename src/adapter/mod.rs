//! Queue Adapter capability model
//!
//! Every broker is reached through [`QueueAdapter`]. On top of the base
//! contract an adapter may expose any of three independent capabilities:
//!
//! | Capability | Trait | Accessor |
//! |---|---|---|
//! | push consumption | [`Subscribing`] | `as_subscribing()` |
//! | broker transactions | [`Transactional`] | `as_transactional()` |
//! | request/reply | [`DuplexReply`] | `as_duplex()` |
//!
//! Reactor selection looks only at which accessors return `Some`.
//!
//! # Example
//!
//! ```rust
//! use queuebridge::adapter::{MemoryAdapter, MemoryBroker, Capabilities, QueueAdapter};
//! use queuebridge::config::{BrokerFamily, ProcessingMode, QueueEndpoint};
//! use queuebridge::message::Envelope;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = QueueEndpoint::new("orders", BrokerFamily::Memory, ProcessingMode::ThreadPolling);
//! let adapter = MemoryAdapter::new(endpoint, MemoryBroker::new(), Capabilities::NONE);
//!
//! let sent = adapter.send(Envelope::text("order #1")).await?;
//! assert!(sent.id().is_some());
//! assert!(adapter.as_subscribing().is_none());
//! # Ok(())
//! # }
//! ```

pub mod connection;
mod error;
pub mod memory;
pub mod provider;
mod traits;

pub use connection::ConnectionGuard;
pub use error::{AdapterError, AdapterResult};
pub use memory::{MemoryAdapter, MemoryBroker};
pub use provider::{AdapterProvider, AdapterRegistry, MemoryProvider};
pub use traits::{
    Capabilities, DuplexReply, InboundHandler, QueueAdapter, Subscribing, Transactional,
};
