//! Adapter base contract and capability traits

use crate::adapter::error::{AdapterError, AdapterResult};
use crate::config::QueueEndpoint;
use crate::message::Envelope;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Base contract every broker adapter implements
///
/// Optional behaviour is discovered through the `as_*` accessors. An adapter
/// that does not support a capability returns `None`; there is no no-op
/// fallback. The answer never changes over the adapter's lifetime.
#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Id of the configured queue this adapter serves
    fn queue_id(&self) -> &str;

    fn endpoint(&self) -> &QueueEndpoint;

    /// Open the transport connection. Idempotent while connected.
    async fn connect(&self) -> AdapterResult<()>;

    /// Close the connection. Idempotent, and safe before any connect.
    async fn disconnect(&self) -> AdapterResult<()>;

    /// Open connection and, with a push consumer active, a running consumer
    fn is_connected(&self) -> bool;

    /// Publish a message, returning it with identity and send time stamped
    async fn send(&self, message: Envelope) -> AdapterResult<Envelope>;

    /// Pull one message; `None` means "no message" rather than an error
    ///
    /// With `timeout` set the call waits up to that long for a message.
    async fn try_receive(&self, timeout: Option<Duration>) -> AdapterResult<Option<Envelope>>;

    /// Pull one message, reporting an empty queue as `ReceiveEmpty`
    async fn receive(&self, timeout: Option<Duration>) -> AdapterResult<Envelope> {
        match self.try_receive(timeout).await? {
            Some(message) => Ok(message),
            None => Err(AdapterError::ReceiveEmpty {
                queue_id: self.queue_id().to_string(),
            }),
        }
    }

    fn as_subscribing(&self) -> Option<&dyn Subscribing> {
        None
    }

    fn as_transactional(&self) -> Option<&dyn Transactional> {
        None
    }

    fn as_duplex(&self) -> Option<&dyn DuplexReply> {
        None
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            subscribing: self.as_subscribing().is_some(),
            transactional: self.as_transactional().is_some(),
            duplex: self.as_duplex().is_some(),
        }
    }
}

/// Receiver for push-delivered messages
///
/// Returns nothing: failures inside a handler stay inside the handler and
/// never reach transport code.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn on_message(&self, message: Envelope);
}

/// Push-model consumption
#[async_trait]
pub trait Subscribing: Send + Sync {
    /// Start pushing messages into `handler` from the adapter's transport task
    async fn subscribe(&self, handler: Arc<dyn InboundHandler>) -> AdapterResult<()>;

    /// Stop the push consumer. Idempotent.
    async fn unsubscribe(&self) -> AdapterResult<()>;
}

/// Broker-side transactions around the last received message
#[async_trait]
pub trait Transactional: Send + Sync {
    async fn commit_if_transacted(&self, message: &Envelope) -> AdapterResult<()>;

    async fn rollback_if_transacted(&self) -> AdapterResult<()>;
}

/// Request/reply over one-way queues
#[async_trait]
pub trait DuplexReply: Send + Sync {
    /// Send `request` and wait for exactly one correlated reply
    async fn request_and_wait_response(&self, request: Envelope) -> AdapterResult<Envelope>;

    /// Publish `response` to its `reply_destination`
    async fn reply(&self, response: Envelope) -> AdapterResult<()>;
}

/// Snapshot of the capabilities an adapter exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub subscribing: bool,
    pub transactional: bool,
    pub duplex: bool,
}

impl Capabilities {
    /// Base contract only
    pub const NONE: Capabilities = Capabilities {
        subscribing: false,
        transactional: false,
        duplex: false,
    };

    pub const ALL: Capabilities = Capabilities {
        subscribing: true,
        transactional: true,
        duplex: true,
    };

    pub fn with_subscribing(mut self, subscribing: bool) -> Self {
        self.subscribing = subscribing;
        self
    }

    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn with_duplex(mut self, duplex: bool) -> Self {
        self.duplex = duplex;
        self
    }

    /// Every combination of the three capabilities
    pub fn all_combinations() -> Vec<Capabilities> {
        let mut combinations = Vec::with_capacity(8);
        for bits in 0u8..8 {
            combinations.push(Capabilities {
                subscribing: bits & 0b001 != 0,
                transactional: bits & 0b010 != 0,
                duplex: bits & 0b100 != 0,
            });
        }
        combinations
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.subscribing {
            names.push("subscribing");
        }
        if self.transactional {
            names.push("transactional");
        }
        if self.duplex {
            names.push("duplex");
        }
        if names.is_empty() {
            write!(f, "base")
        } else {
            write!(f, "{}", names.join("+"))
        }
    }
}
