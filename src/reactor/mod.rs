//! Reactors
//!
//! A reactor owns one adapter and one processor and keeps messages flowing
//! between them. Which reactor a queue gets depends on what the adapter can
//! do and how the queue is configured:
//!
//! | adapter             | mode                  | reactor               |
//! |---------------------|-----------------------|-----------------------|
//! | transactional       | any                   | transacted polling    |
//! | subscribing         | `subscribe`           | subscribed            |
//! | subscribing         | `subscribe_and_reply` | subscribe-and-reply   |
//! | anything else       | any                   | polling               |
//!
//! ```rust,no_run
//! use queuebridge::adapter::{AdapterRegistry, MemoryBroker, MemoryProvider};
//! use queuebridge::config::{BrokerFamily, EndpointSet, ProcessingMode, QueueEndpoint};
//! use queuebridge::processor::{Processor, ProcessorRegistry};
//! use queuebridge::reactor::{Reactor, ReactorFactory};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoints = EndpointSet::from_endpoints(vec![QueueEndpoint::new(
//!     "orders",
//!     BrokerFamily::Memory,
//!     ProcessingMode::ThreadPolling,
//! )])?;
//! let mut adapters = AdapterRegistry::new();
//! adapters.register(Arc::new(MemoryProvider::new(MemoryBroker::new())))?;
//!
//! let factory = ReactorFactory::new(
//!     Arc::new(ProcessorRegistry::new()),
//!     Arc::new(adapters),
//!     Arc::new(endpoints),
//! );
//! factory.register("orders", Processor::consume_fn(|_| async { Ok(()) }))?;
//!
//! let mut reactor = factory.create_queue_reactor("orders")?;
//! reactor.start().await?;
//! reactor.stop().await?;
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
pub mod factory;
mod kind;
mod polling;
mod statistics;
mod subscribed;
mod traits;

pub use error::{HandlerFailure, ReactorError, ReactorResult};
pub use factory::ReactorFactory;
pub use kind::{ReactorKind, ReactorState};
pub use polling::PollingReactor;
pub use statistics::{ReactorStatistics, StatisticsSnapshot};
pub use subscribed::SubscribedReactor;
pub use traits::Reactor;

#[cfg(test)]
mod tests;
