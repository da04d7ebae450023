//! Broker-agnostic message envelope

use crate::message::properties::{Properties, PropertyValue};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Message body: either text or raw bytes, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

/// Message envelope exchanged with every adapter
///
/// Callers build envelopes with the `with_*` methods. The identity fields may
/// be left empty: adapters call [`Envelope::ensure_identity`] before a message
/// crosses the adapter boundary, so `id` and `correlation_id` are always
/// populated on anything returned by `send` or `receive`. Timestamps are only
/// ever written by adapters.
///
/// # Example
///
/// ```rust
/// use queuebridge::message::Envelope;
/// use std::time::Duration;
///
/// let order = Envelope::text("{\"sku\":\"A-1\"}")
///     .with_correlation_id("order-42")
///     .with_lifetime(Duration::from_secs(30))
///     .with_property("tenant", "acme");
///
/// assert_eq!(order.correlation_id(), Some("order-42"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    id: Option<String>,
    correlation_id: Option<String>,
    /// Name of the channel replies should go to
    pub reply_destination: Option<String>,
    /// Time-to-live measured from the send timestamp
    pub lifetime: Option<Duration>,
    send_timestamp: Option<DateTime<Utc>>,
    receive_timestamp: Option<DateTime<Utc>>,
    pub properties: Properties,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            id: None,
            correlation_id: None,
            reply_destination: None,
            lifetime: None,
            send_timestamp: None,
            receive_timestamp: None,
            properties: Properties::new(),
            payload: payload.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Payload::Text(text.into()))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Payload::Bytes(bytes.into()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reply_destination(mut self, destination: impl Into<String>) -> Self {
        self.reply_destination = Some(destination.into());
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Build a reply carrying this message's correlation id
    pub fn reply_with(&self, payload: impl Into<Payload>) -> Envelope {
        let reply = Envelope::new(payload);
        match self.correlation_id() {
            Some(correlation_id) => reply.with_correlation_id(correlation_id),
            None => reply,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Correlation id, falling back to the message id
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.id())
    }

    pub fn set_correlation_id(&mut self, correlation_id: impl Into<String>) {
        self.correlation_id = Some(correlation_id.into());
    }

    pub fn send_timestamp(&self) -> Option<DateTime<Utc>> {
        self.send_timestamp
    }

    pub fn receive_timestamp(&self) -> Option<DateTime<Utc>> {
        self.receive_timestamp
    }

    /// Generate an id when absent and default the correlation id to it
    pub fn ensure_identity(&mut self) {
        if self.id().is_none() {
            self.id = Some(uuid::Uuid::new_v4().to_string());
        }
        let has_correlation = self
            .correlation_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        if !has_correlation {
            self.correlation_id = self.id.clone();
        }
    }

    /// Adapter hook: stamp identity and send time (kept if already set)
    pub fn mark_sent(&mut self) {
        self.ensure_identity();
        if self.send_timestamp.is_none() {
            self.send_timestamp = Some(Utc::now());
        }
    }

    /// Adapter hook: stamp identity and receive time
    pub fn mark_received(&mut self) {
        self.ensure_identity();
        self.receive_timestamp = Some(Utc::now());
    }

    /// True once `send_timestamp + lifetime` lies before `now`
    ///
    /// A lifetime reaching past the representable time range never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let (Some(sent), Some(lifetime)) = (self.send_timestamp, self.lifetime) else {
            return false;
        };
        chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| sent.checked_add_signed(lifetime))
            .is_some_and(|expires_at| expires_at < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
