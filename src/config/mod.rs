//! Queue Endpoint Configuration
//!
//! Endpoints come either from code or from a TOML file with one `[[queue]]`
//! table per queue:
//!
//! ```toml
//! [[queue]]
//! id = "orders"
//! broker = "rabbitmq"
//! processing_mode = "subscribe_and_reply"
//! reply_timeout_ms = 5000
//!
//! [queue.params]
//! host = "amqp://localhost"
//! queue = "orders"
//! ```
//!
//! Durations are milliseconds. Broker parameters are opaque to the core;
//! only their presence is checked against [`BrokerFamily::required_params`].

mod endpoint;
mod endpoint_set;
mod error;

pub use endpoint::{
    BrokerFamily, ProcessingMode, QueueEndpoint, DEFAULT_POLL_INTERVAL, DEFAULT_REPLY_TIMEOUT,
};
pub use endpoint_set::EndpointSet;
pub use error::{ConfigError, ConfigResult};
